//! Upload of generated artifacts to deterministic keys.

use crate::error::CertgenError;
use crate::request::ArtifactId;
use crate::storage::ObjectStore;
use tracing::info;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// `<prefix>/jpg/<id>.jpg`
pub fn image_key(prefix: &str, id: &ArtifactId) -> String {
    join_key(prefix, &format!("jpg/{id}.jpg"))
}

/// `<prefix>/pdf/<id>.pdf`
pub fn pdf_key(prefix: &str, id: &ArtifactId) -> String {
    join_key(prefix, &format!("pdf/{id}.pdf"))
}

fn join_key(prefix: &str, rest: &str) -> String {
    if prefix.is_empty() {
        rest.to_string()
    } else {
        format!("{prefix}/{rest}")
    }
}

/// Upload `body` to `bucket/key`.
pub async fn publish(
    store: &dyn ObjectStore,
    bucket: &str,
    key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> Result<(), CertgenError> {
    let len = body.len();
    store
        .upload(bucket, key, body, content_type)
        .await
        .map_err(|source| CertgenError::Publish {
            key: key.to_string(),
            source,
        })?;
    info!("Published {}/{} ({} bytes)", bucket, key, len);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStore;

    #[test]
    fn keys() {
        let id = ArtifactId::parse("abc").unwrap();
        assert_eq!(image_key("certificates", &id), "certificates/jpg/abc.jpg");
        assert_eq!(pdf_key("certificates", &id), "certificates/pdf/abc.pdf");
        assert_eq!(image_key("", &id), "jpg/abc.jpg");
    }

    #[tokio::test]
    async fn publishes_to_store() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        publish(&store, "public", "certificates/jpg/abc.jpg", vec![0xFF, 0xD8], JPEG_CONTENT_TYPE)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read(root.path().join("public/certificates/jpg/abc.jpg")).unwrap(),
            vec![0xFF, 0xD8]
        );
    }

    #[tokio::test]
    async fn bad_key_is_publish_error() {
        let root = tempfile::tempdir().unwrap();
        let store = LocalStore::new(root.path());
        let err = publish(&store, "public", "../escape.jpg", vec![], JPEG_CONTENT_TYPE)
            .await
            .unwrap_err();
        assert_eq!(err.stage(), crate::error::Stage::Publish);
    }
}
