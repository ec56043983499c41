use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use uuid::Uuid;

use crate::error::{AppError, Result};

/// Sub-directory of the media root an upload is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFolder {
    Banners,
    Categories,
    Products,
    ProductBanners,
    Reviews,
}

impl ImageFolder {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFolder::Banners => "banners",
            ImageFolder::Categories => "categories",
            ImageFolder::Products => "products",
            ImageFolder::ProductBanners => "products/banners",
            ImageFolder::Reviews => "reviews",
        }
    }
}

/// Keeps ASCII letters, digits, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are dropped so a name can never climb out of its folder.
pub fn sanitize_filename(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Relative path an upload is stored under, e.g. `banners/{uuid}_hero.png`.
pub fn stored_path(folder: ImageFolder, original: &str) -> String {
    format!(
        "{}/{}_{}",
        folder.as_str(),
        Uuid::new_v4(),
        sanitize_filename(original)
    )
}

/// Uploaded images on local disk, addressed by paths relative to the root.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
    timeout: Duration,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            root: root.into(),
            timeout,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, relative: &str) -> Result<PathBuf> {
        let relative = Path::new(relative);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(AppError::BadRequest("Invalid image path".to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Writes the bytes under a fresh collision-free name and returns the
    /// relative path to store in the database.
    pub async fn save(&self, folder: ImageFolder, original: &str, bytes: &[u8]) -> Result<String> {
        let relative = stored_path(folder, original);
        let path = self.absolute(&relative)?;

        let write = async {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, bytes).await
        };

        tokio::time::timeout(self.timeout, write)
            .await
            .map_err(|_| AppError::InternalError(format!("Timed out writing {}", relative)))?
            .map_err(|e| {
                tracing::error!("Failed to write image {}: {:?}", relative, e);
                AppError::InternalError("Failed to store image".to_string())
            })?;

        tracing::debug!("Stored image {}", relative);
        Ok(relative)
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) -> Result<()> {
        if relative.is_empty() {
            return Ok(());
        }
        let path = self.absolute(relative)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Image {} was already removed", relative);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to delete image {}: {:?}", relative, e);
                Err(AppError::InternalError("Failed to delete image".to_string()))
            }
        }
    }

    pub async fn delete_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.delete(path).await {
                tracing::warn!("Leaving image {} behind: {}", path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitises_uploaded_names() {
        assert_eq!(sanitize_filename("Hero Banner (1).png"), "Hero_Banner__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\photos\\frame.jpg"), "frame.jpg");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "upload");
    }

    #[test]
    fn stored_names_are_unique_per_upload() {
        let a = stored_path(ImageFolder::ProductBanners, "a.png");
        let b = stored_path(ImageFolder::ProductBanners, "a.png");

        assert!(a.starts_with("products/banners/"));
        assert!(a.ends_with("_a.png"));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn saves_and_deletes_under_the_root() {
        let root = std::env::temp_dir().join(format!("joyful-images-{}", Uuid::new_v4()));
        let store = ImageStore::new(&root, Duration::from_secs(5));

        let relative = store
            .save(ImageFolder::Reviews, "photo.jpg", b"jpeg")
            .await
            .unwrap();
        let written = tokio::fs::read(root.join(&relative)).await.unwrap();
        assert_eq!(written, b"jpeg");

        store.delete(&relative).await.unwrap();
        assert!(!root.join(&relative).exists());
        store.delete(&relative).await.unwrap();

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    fn assert_send<T: Send>(_: &T) {}

    #[tokio::test]
    async fn delete_all_removes_every_listed_file() {
        let root = std::env::temp_dir().join(format!("joyful-images-{}", Uuid::new_v4()));
        let store = ImageStore::new(&root, Duration::from_secs(5));

        let desktop = store
            .save(ImageFolder::Banners, "wide.png", b"png")
            .await
            .unwrap();
        let mobile = store
            .save(ImageFolder::Banners, "narrow.png", b"png")
            .await
            .unwrap();

        let files: Vec<String> = std::iter::once(desktop.clone())
            .chain(Some(mobile.clone()))
            .chain(Some(String::new()))
            .collect();
        let cleanup = store.delete_all(&files);
        assert_send(&cleanup);
        cleanup.await;

        assert!(!root.join(&desktop).exists());
        assert!(!root.join(&mobile).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn rejects_paths_outside_the_root() {
        let store = ImageStore::new("images", Duration::from_secs(1));
        assert!(store.delete("../secret.txt").await.is_err());
    }
}
