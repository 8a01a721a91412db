//! # CLI Command Implementations
//!
//! Each command opens the configured log, replays it into a fresh
//! `GdaSession` and runs one boundary operation.

use crate::config::StoreConfig;
use crate::error::AppError;
use gridmodel_core::{
    Association, CursorId, Delta, DmsType, GdaSession, Gid, GridError, ImportContext,
    ImportOutcome, ImportRecord, ModelCode, NetworkModel, ReplayReport, ResourceDescription,
    UpdateResult, schema,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a delta or import file (100 MB).
const MAX_INPUT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Canonicalize `path` and make sure it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| AppError::Input(format!("Invalid file path '{}': {}", path.display(), e)))?;
    if !canonical.is_file() {
        return Err(AppError::Input(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }
    Ok(canonical)
}

fn validate_file_size(path: &Path, max_size: u64) -> Result<(), AppError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| AppError::Input(format!("Cannot read file metadata: {}", e)))?;
    if metadata.len() > max_size {
        return Err(AppError::Input(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Read and parse a JSON input file.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INPUT_FILE_SIZE)?;
    let contents = std::fs::read(&validated)
        .map_err(|e| AppError::Input(format!("Read {}: {}", path.display(), e)))?;
    serde_json::from_slice(&contents)
        .map_err(|e| AppError::Input(format!("Parse {}: {}", path.display(), e)))
}

// =============================================================================
// SESSION
// =============================================================================

/// Open the configured log and replay it.
pub fn open_session(config: &StoreConfig) -> (GdaSession, ReplayReport) {
    let model = NetworkModel::open(&config.log_path, config.sync_on_commit);
    let mut session = GdaSession::new(model);
    let report = session.initialize();
    for failure in &report.failures {
        tracing::warn!(
            record = ?failure.record,
            reason = %failure.reason,
            "Log record not replayed"
        );
    }
    (session, report)
}

/// Drain a cursor page by page, then close it.
pub fn drain_cursor(
    session: &mut GdaSession,
    id: CursorId,
    batch: usize,
) -> Result<Vec<ResourceDescription>, GridError> {
    let mut out = Vec::with_capacity(session.iterator_resources_total(id)?);
    while session.iterator_resources_left(id)? > 0 {
        out.extend(session.iterator_next(batch.max(1), id)?);
    }
    session.iterator_close(id)?;
    Ok(out)
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| GridError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_description(rd: &ResourceDescription) {
    let kind = rd
        .id
        .dms_type()
        .map_or_else(|| "?".to_string(), |k| k.to_string());
    println!("{} ({})", rd.id, kind);
    for property in &rd.properties {
        println!("  {:<28} {:?}", property.id.to_string(), property.value);
    }
}

fn print_descriptions(descriptions: &[ResourceDescription], json_mode: bool) -> Result<(), AppError> {
    if json_mode {
        return print_json(descriptions);
    }
    for rd in descriptions {
        print_description(rd);
    }
    println!();
    println!("{} resource(s)", descriptions.len());
    Ok(())
}

fn id_pairs(result: &UpdateResult) -> BTreeMap<String, String> {
    result
        .global_id_pairs
        .iter()
        .map(|(tmp, gid)| (tmp.to_string(), gid.to_string()))
        .collect()
}

fn print_update(result: &UpdateResult, json_mode: bool) -> Result<(), AppError> {
    if json_mode {
        return print_json(&serde_json::json!({
            "result": format!("{:?}", result.result),
            "message": result.message,
            "global_id_pairs": id_pairs(result),
        }));
    }
    println!("Result:  {:?}", result.result);
    println!("Message: {}", result.message);
    for (tmp, gid) in &result.global_id_pairs {
        println!("  {} -> {}", tmp, gid);
    }
    Ok(())
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Replay the log and show entity counts.
pub fn cmd_status(config: &StoreConfig, json_mode: bool) -> Result<(), AppError> {
    let (session, report) = open_session(config);
    let summary = session.model().summary();

    if json_mode {
        let per_kind: BTreeMap<String, usize> = summary
            .per_kind
            .iter()
            .map(|(kind, count)| (kind.to_string(), *count))
            .collect();
        let next_indices: BTreeMap<String, i32> = summary
            .next_indices
            .iter()
            .map(|(kind, next)| (kind.to_string(), *next))
            .collect();
        return print_json(&serde_json::json!({
            "log_path": config.log_path.to_string_lossy(),
            "records": report.records,
            "applied": report.applied,
            "replay_failures": report.failures.len(),
            "total_entities": summary.total_entities,
            "per_kind": per_kind,
            "next_indices": next_indices,
        }));
    }

    println!("gridmodel Status");
    println!("================");
    println!("Log:      {}", config.log_path.display());
    println!(
        "Replayed: {} of {} record(s)",
        report.applied, report.records
    );
    if !report.is_clean() {
        println!("Skipped:  {}", report.failures.len());
    }
    println!();
    println!("Entities: {}", summary.total_entities);
    for (kind, count) in &summary.per_kind {
        let next = summary.next_indices.get(kind).copied().unwrap_or(1);
        println!("  {:<26} {:>8}  (next index {})", kind.to_string(), count, next);
    }
    Ok(())
}

// =============================================================================
// APPLY COMMAND
// =============================================================================

/// Apply a JSON-encoded `Delta`.
pub fn cmd_apply(config: &StoreConfig, json_mode: bool, file: &Path) -> Result<(), AppError> {
    let delta: Delta = read_json(file)?;
    tracing::info!(file = %file.display(), operations = delta.len(), "Applying delta");

    let (mut session, _) = open_session(config);
    let result = session.apply_update(delta);
    print_update(&result, json_mode)?;

    if result.is_success() {
        Ok(())
    } else {
        Err(AppError::Rejected(result.message))
    }
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Convert import records into one insert delta and apply it.
///
/// Records that fail conversion are reported and left out; the rest are
/// still committed.
pub fn cmd_import(config: &StoreConfig, json_mode: bool, file: &Path) -> Result<(), AppError> {
    let records: Vec<ImportRecord> = read_json(file)?;
    tracing::info!(file = %file.display(), records = records.len(), "Importing records");

    let mut context = ImportContext::new();
    let report = context.import_records(records);

    let (mut session, _) = open_session(config);
    let result = (report.converted() > 0).then(|| session.apply_update(context.into_delta()));

    let committed = |tmp: Gid| {
        result
            .as_ref()
            .and_then(|r| r.global_id_pairs.get(&tmp).copied())
    };

    if json_mode {
        let entries: Vec<serde_json::Value> = report
            .entries
            .iter()
            .map(|entry| match &entry.outcome {
                ImportOutcome::Converted(tmp) => serde_json::json!({
                    "kind": entry.kind.to_string(),
                    "external_id": entry.external_id,
                    "temporary": tmp.to_string(),
                    "gid": committed(*tmp).map(|g| g.to_string()),
                }),
                ImportOutcome::Failed(reason) => serde_json::json!({
                    "kind": entry.kind.to_string(),
                    "external_id": entry.external_id,
                    "error": reason,
                }),
            })
            .collect();
        print_json(&serde_json::json!({
            "converted": report.converted(),
            "failed": report.failed(),
            "update": result.as_ref().map(|r| serde_json::json!({
                "result": format!("{:?}", r.result),
                "message": r.message,
            })),
            "entries": entries,
        }))?;
    } else {
        println!(
            "Converted {} record(s), {} failed",
            report.converted(),
            report.failed()
        );
        for entry in &report.entries {
            match &entry.outcome {
                ImportOutcome::Converted(tmp) => {
                    let gid = committed(*tmp).map_or_else(|| "-".to_string(), |g| g.to_string());
                    println!("  {:<24} {} -> {}", entry.external_id, tmp, gid);
                }
                ImportOutcome::Failed(reason) => {
                    println!("  {:<24} FAILED: {}", entry.external_id, reason);
                }
            }
        }
        if let Some(result) = &result {
            println!();
            print_update(result, false)?;
        }
    }

    if let Some(result) = result.filter(|r| !r.is_success()) {
        return Err(AppError::Rejected(result.message));
    }
    if !report.is_success() {
        return Err(AppError::Rejected(format!(
            "{} of {} record(s) failed conversion",
            report.failed(),
            report.entries.len()
        )));
    }
    Ok(())
}

// =============================================================================
// QUERY COMMANDS
// =============================================================================

fn kind_of(gid: Gid) -> Result<DmsType, GridError> {
    gid.dms_type().ok_or(GridError::UnsupportedType(gid.type_code()))
}

fn codes_or_all(attrs: &[ModelCode], kind: DmsType) -> Vec<ModelCode> {
    if attrs.is_empty() {
        schema::properties_of(kind)
    } else {
        attrs.to_vec()
    }
}

/// Show properties of one entity.
pub fn cmd_get(
    config: &StoreConfig,
    json_mode: bool,
    gid: Gid,
    attrs: &[ModelCode],
) -> Result<(), AppError> {
    let codes = codes_or_all(attrs, kind_of(gid)?);
    let (session, _) = open_session(config);
    let rd = session.get_values(gid, &codes)?;

    if json_mode {
        return print_json(&rd);
    }
    print_description(&rd);
    Ok(())
}

/// List every entity of `kind`.
pub fn cmd_extent(
    config: &StoreConfig,
    json_mode: bool,
    kind: DmsType,
    attrs: &[ModelCode],
    batch: Option<usize>,
) -> Result<(), AppError> {
    let codes = codes_or_all(attrs, kind);
    let (mut session, _) = open_session(config);
    let id = session.get_extent_values(kind, &codes)?;
    let descriptions = drain_cursor(&mut session, id, batch.unwrap_or(config.iterator_batch))?;
    print_descriptions(&descriptions, json_mode)
}

/// List the entities `gid` reaches through `property`.
///
/// Without `--attr` each target is shown with its name and mRID.
pub fn cmd_related(
    config: &StoreConfig,
    json_mode: bool,
    gid: Gid,
    property: ModelCode,
    type_filter: Option<ModelCode>,
    attrs: &[ModelCode],
) -> Result<(), AppError> {
    let codes = if attrs.is_empty() {
        vec![ModelCode::IDOBJ_MRID, ModelCode::IDOBJ_NAME]
    } else {
        attrs.to_vec()
    };
    let association = match type_filter {
        Some(filter) => Association::with_type(property, filter),
        None => Association::new(property),
    };

    let (mut session, _) = open_session(config);
    let id = session.get_related_values(gid, &codes, &association)?;
    let descriptions = drain_cursor(&mut session, id, config.iterator_batch)?;
    print_descriptions(&descriptions, json_mode)
}

// =============================================================================
// DUMP COMMAND
// =============================================================================

/// Print every entity in GID order.
pub fn cmd_dump(config: &StoreConfig, json_mode: bool) -> Result<(), AppError> {
    let (session, _) = open_session(config);
    print_descriptions(&session.model().dump(), json_mode)
}
