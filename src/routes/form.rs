use std::{collections::HashMap, str::FromStr};

use axum::{body::Bytes, extract::Multipart};

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

/// A fully read multipart body: text fields by name, files by field name.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<Upload>>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                    if !bytes.is_empty() {
                        form.files
                            .entry(name)
                            .or_default()
                            .push(Upload { file_name, bytes });
                    }
                }
                None => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Failed to read {}: {}", name, e)))?;
                    form.fields.insert(name, text);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed value of a text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> Result<&str> {
        self.text(name)
            .ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
    }

    pub fn parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.text(name)
            .map(|raw| {
                raw.parse::<T>()
                    .map_err(|_| AppError::BadRequest(format!("Invalid {} value", name)))
            })
            .transpose()
    }

    pub fn required_parsed<T: FromStr>(&self, name: &str) -> Result<T> {
        self.parsed(name)?
            .ok_or_else(|| AppError::BadRequest(format!("{} is required", name)))
    }

    /// Accepts `true`/`false` as well as `1`/`0`, `on`/`off` and `yes`/`no`.
    pub fn flag(&self, name: &str) -> Result<Option<bool>> {
        match self.text(name).map(str::to_ascii_lowercase).as_deref() {
            None => Ok(None),
            Some("true" | "1" | "on" | "yes") => Ok(Some(true)),
            Some("false" | "0" | "off" | "no") => Ok(Some(false)),
            Some(_) => Err(AppError::BadRequest(format!("Invalid {} value", name))),
        }
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name).and_then(|files| files.first())
    }

    pub fn required_file(&self, name: &str) -> Result<&Upload> {
        self.file(name)
            .ok_or_else(|| AppError::BadRequest(format!("{} file is required", name)))
    }

    pub fn files(&self, name: &str) -> &[Upload] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}
