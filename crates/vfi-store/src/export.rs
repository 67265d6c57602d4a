use std::fs;
use std::path::Path;

use vfi_core::errors::{ErrorInfo, VfiError};

use crate::schema::SqliteStore;

pub fn export_json(store: &SqliteStore, out_path: &Path) -> Result<(), VfiError> {
    let attempts = store.load()?;
    let json = serde_json::to_string_pretty(&attempts).map_err(|err| {
        VfiError::Store(ErrorInfo::new("store.export", err.to_string()))
    })?;
    fs::write(out_path, json).map_err(|err| {
        VfiError::Store(
            ErrorInfo::new("store.export", err.to_string())
                .with_context("path", out_path.display().to_string()),
        )
    })
}

pub fn export_csv(store: &SqliteStore, out_path: &Path) -> Result<(), VfiError> {
    let mut wtr = csv::Writer::from_path(out_path).map_err(|err| {
        VfiError::Store(
            ErrorInfo::new("store.export", err.to_string())
                .with_context("path", out_path.display().to_string()),
        )
    })?;
    wtr.write_record([
        "id",
        "recorded_at",
        "ext_offset",
        "width",
        "voltage",
        "prep_voltage",
        "result",
        "values",
    ])
    .map_err(|err| VfiError::Store(ErrorInfo::new("store.export", err.to_string())))?;
    for attempt in store.load()? {
        let values = attempt
            .values
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        wtr.write_record([
            attempt.id.to_string(),
            attempt.recorded_at.clone(),
            attempt.settings.ext_offset.to_string(),
            attempt.settings.width.to_string(),
            attempt.settings.voltage.to_string(),
            attempt.settings.prep_voltage.to_string(),
            attempt.result.clone(),
            values,
        ])
        .map_err(|err| VfiError::Store(ErrorInfo::new("store.export", err.to_string())))?;
    }
    wtr.flush()
        .map_err(|err| VfiError::Store(ErrorInfo::new("store.export", err.to_string())))
}
