use crate::cli::args::{CliArgs, Command};
use crate::export::ExportScope;
use crate::records::EditField;
use crate::state::{OrphanPolicy, TagPolicy};

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.tag_policy.as_deref() {
        TagPolicy::parse(raw)
            .ok_or_else(|| format!("invalid --tag-policy '{raw}', expected multi-tag or single-tag"))?;
    }
    if let Some(raw) = args.orphan_policy.as_deref() {
        OrphanPolicy::parse(raw)
            .ok_or_else(|| format!("invalid --orphan-policy '{raw}', expected retag or drop"))?;
    }
    if let Some(raw) = args.export_scope.as_deref() {
        ExportScope::parse(raw).ok_or_else(|| {
            format!("invalid --export-scope '{raw}', expected all-groups or active-group")
        })?;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected positive integer".to_string());
        }
    }
    if let Command::Edit { field, .. } = &args.command {
        EditField::parse(field)
            .ok_or_else(|| format!("invalid field '{field}', expected name or address"))?;
    }
    Ok(())
}
