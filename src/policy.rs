//! Authorization gates. Each gate sees the authenticated caller plus the
//! ownership facts already loaded from storage and decides whether the
//! mutation may proceed. Gates never touch storage themselves.

use crate::{auth::extractors::AuthUser, users::repo_types::Role};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct Denied(pub String);

pub type Gate = Result<(), Denied>;

fn deny(reason: &str) -> Gate {
    Err(Denied(reason.to_string()))
}

/// The subject and email in the payload must both be the caller's own.
pub fn update_profile(caller: &AuthUser, payload_id: &str, payload_email: &str) -> Gate {
    if caller.id != payload_id {
        return deny("cannot update another user's profile");
    }
    if caller.email != payload_email {
        return deny("email cannot be changed");
    }
    Ok(())
}

pub fn delete_account(caller: &AuthUser, target_id: &str) -> Gate {
    if caller.id != target_id {
        return deny("cannot delete another user's account");
    }
    Ok(())
}

pub fn create_property(role: Role) -> Gate {
    match role {
        Role::Lister | Role::Admin => Ok(()),
        Role::Regular => deny("only listers can create properties"),
    }
}

pub fn update_property(caller: &AuthUser, role: Role, lister_id: &str, admin_id: &str) -> Gate {
    create_property(role)?;
    if caller.id == lister_id || caller.id == admin_id {
        return Ok(());
    }
    deny("only the property's lister can update it")
}

pub fn delete_property(caller: &AuthUser, lister_id: &str, admin_id: &str) -> Gate {
    if caller.id == lister_id || caller.id == admin_id {
        return Ok(());
    }
    deny("only the property's lister can delete it")
}

pub fn create_community(caller: &AuthUser, declared_admin: &str) -> Gate {
    if caller.id != declared_admin {
        return deny("community admin must be the caller");
    }
    Ok(())
}

pub fn community_creator(role: Role) -> Gate {
    match role {
        Role::Lister | Role::Admin => Ok(()),
        Role::Regular => deny("only listers can create communities"),
    }
}

/// Adding members or linking properties.
pub fn manage_community(caller: &AuthUser, community_admin: &str) -> Gate {
    if caller.id != community_admin {
        return deny("not the community admin");
    }
    Ok(())
}

pub fn remove_community_member(caller: &AuthUser, community_admin: &str, target: &str) -> Gate {
    manage_community(caller, community_admin)?;
    if target == community_admin {
        return deny("the admin cannot leave the community; delete it instead");
    }
    Ok(())
}

pub fn delete_community(caller: &AuthUser, community_admin: &str, admin_id: &str) -> Gate {
    if caller.id == community_admin || caller.id == admin_id {
        return Ok(());
    }
    deny("only the community admin can delete it")
}

pub fn change_role(caller: &AuthUser, target: &str, admin_id: &str) -> Gate {
    if caller.id != admin_id {
        return deny("admin privileges required");
    }
    if target == admin_id {
        return deny("admin cannot change their own role");
    }
    Ok(())
}

pub fn change_status(caller: &AuthUser, target: &str, admin_id: &str) -> Gate {
    if caller.id != admin_id {
        return deny("admin privileges required");
    }
    if target == admin_id {
        return deny("admin cannot change their own status");
    }
    Ok(())
}
