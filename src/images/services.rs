use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{error::AppError, validation::ValidationError};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_IMAGES: usize = 10;
/// Room for the `data` part and multipart framing on top of the files.
pub const FORM_OVERHEAD: usize = 256 * 1024;

/// Body limit for a route accepting up to `files` images.
pub const fn upload_limit(files: usize) -> usize {
    files * MAX_IMAGE_BYTES + FORM_OVERHEAD
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::rejected(e.status(), format!("malformed multipart body: {}", e.body_text()))
}

/// One binary part of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadItem {
    pub fn size(&self) -> i32 {
        i32::try_from(self.body.len()).unwrap_or(i32::MAX)
    }
}

/// Multipart body split into the `data` JSON part and named file parts.
#[derive(Debug, Default)]
pub struct Form {
    pub data: Option<Bytes>,
    files: Vec<(String, UploadItem)>,
}

impl Form {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let data = self
            .data
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("data part is required".into()))?;
        serde_json::from_slice(data)
            .map_err(|e| AppError::BadRequest(format!("invalid data part: {e}")))
    }

    /// Removes and returns every file sent under `field` (or `field[]`),
    /// in upload order.
    pub fn take_files(&mut self, field: &str) -> Vec<UploadItem> {
        let array_field = format!("{field}[]");
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(name, _)| name == field || *name == array_field);
        self.files = rest;
        taken.into_iter().map(|(_, item)| item).collect()
    }
}

pub async fn read_form(mut mp: Multipart) -> Result<Form, AppError> {
    let mut form = Form::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "data" {
            let data = field
                .bytes()
                .await
                .map_err(multipart_error)?;
            form.data = Some(data);
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(multipart_error)?;
        debug!(field = %name, file_name = %file_name, size = body.len(), "multipart file");
        form.files.push((
            name,
            UploadItem {
                file_name,
                content_type,
                body,
            },
        ));
    }
    Ok(form)
}

/// Mutating body that is either plain JSON or multipart with a `data` part.
/// Plain JSON bodies become a [`Form`] with no files.
pub struct FormOrJson(pub Form);

#[async_trait]
impl<S> FromRequest<S> for FormOrJson
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));
        if multipart {
            let mp = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
            return Ok(FormOrJson(read_form(mp).await?));
        }
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::rejected(e.status(), e.body_text()))?;
        Ok(FormOrJson(Form {
            data: Some(body),
            files: Vec::new(),
        }))
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub fn check_images(items: &[UploadItem]) -> Result<(), ValidationError> {
    if items.len() > MAX_IMAGES {
        return Err(ValidationError::new(format!(
            "at most {MAX_IMAGES} images are allowed"
        )));
    }
    for item in items {
        if ext_from_mime(&item.content_type).is_none() {
            return Err(ValidationError::new(format!(
                "{} has unsupported type {}",
                item.file_name, item.content_type
            )));
        }
        if item.body.is_empty() {
            return Err(ValidationError::new(format!("{} is empty", item.file_name)));
        }
        if item.body.len() > MAX_IMAGE_BYTES {
            return Err(ValidationError::new(format!(
                "{} exceeds {} bytes",
                item.file_name, MAX_IMAGE_BYTES
            )));
        }
    }
    Ok(())
}

/// Image as sent to clients; bytes are base64 encoded only here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageView {
    pub file_name: String,
    pub mime: String,
    pub size: i32,
    pub data: String,
}

impl ImageView {
    pub fn encode(file_name: String, mime: String, bytes: &[u8]) -> Self {
        Self {
            file_name,
            mime,
            size: i32::try_from(bytes.len()).unwrap_or(i32::MAX),
            data: STANDARD.encode(bytes),
        }
    }
}

#[cfg(test)]
mod image_tests {
    use super::*;

    fn item(name: &str, ct: &str, len: usize) -> UploadItem {
        UploadItem {
            file_name: name.into(),
            content_type: ct.into(),
            body: Bytes::from(vec![7u8; len]),
        }
    }

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[test]
    fn check_images_limits() {
        assert!(check_images(&[item("a.png", "image/png", 10)]).is_ok());
        assert!(check_images(&[item("a.exe", "application/octet-stream", 10)]).is_err());
        assert!(check_images(&[item("a.png", "image/png", 0)]).is_err());
        assert!(check_images(&[item("a.png", "image/png", MAX_IMAGE_BYTES + 1)]).is_err());
        let many: Vec<_> = (0..=MAX_IMAGES)
            .map(|i| item(&format!("{i}.png"), "image/png", 1))
            .collect();
        assert!(check_images(&many).is_err());
    }

    #[test]
    fn take_files_accepts_array_field_names() {
        let mut form = Form::default();
        form.files.push(("images".into(), item("1.png", "image/png", 1)));
        form.files.push(("avatar".into(), item("me.png", "image/png", 1)));
        form.files.push(("images[]".into(), item("2.png", "image/png", 1)));

        let images = form.take_files("images");
        assert_eq!(
            images.iter().map(|i| i.file_name.as_str()).collect::<Vec<_>>(),
            vec!["1.png", "2.png"]
        );
        assert_eq!(form.take_files("avatar").len(), 1);
        assert!(form.take_files("images").is_empty());
    }

    #[test]
    fn form_json_requires_data_part() {
        let form = Form::default();
        assert!(matches!(
            form.json::<serde_json::Value>(),
            Err(AppError::BadRequest(_))
        ));

        let form = Form {
            data: Some(Bytes::from_static(br#"{"a":1}"#)),
            files: Vec::new(),
        };
        assert_eq!(form.json::<serde_json::Value>().unwrap()["a"], 1);
    }

    #[tokio::test]
    async fn plain_json_body_becomes_form_without_files() {
        let req = Request::builder()
            .header(CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let FormOrJson(mut form) = FormOrJson::from_request(req, &()).await.unwrap();
        assert_eq!(form.json::<serde_json::Value>().unwrap()["name"], "x");
        assert!(form.take_files("images").is_empty());
    }

    #[tokio::test]
    async fn multipart_body_is_split() {
        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{{\"name\":\"x\"}}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"images\"; filename=\"a.png\"\r\n\
             Content-Type: image/png\r\n\r\nPNG\r\n--{b}--\r\n",
            b = boundary
        );
        let req = Request::builder()
            .method("POST")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(axum::body::Body::from(body))
            .unwrap();
        let FormOrJson(mut form) = FormOrJson::from_request(req, &()).await.unwrap();
        assert_eq!(form.json::<serde_json::Value>().unwrap()["name"], "x");
        let images = form.take_files("images");
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].file_name, "a.png");
        assert_eq!(images[0].content_type, "image/png");
        assert_eq!(images[0].body.as_ref(), b"PNG");
    }

    #[test]
    fn upload_limit_fits_every_allowed_image() {
        assert!(upload_limit(1) > MAX_IMAGE_BYTES);
        assert!(upload_limit(MAX_IMAGES) > MAX_IMAGES * MAX_IMAGE_BYTES);
    }

    #[test]
    fn image_view_is_base64() {
        let v = ImageView::encode("a.png".into(), "image/png".into(), b"hello");
        assert_eq!(v.data, "aGVsbG8=");
        assert_eq!(v.size, 5);
    }
}
