//! Version history, restore and audit subcommands.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use contentvc_core::db::Database;
use contentvc_core::models::{ContentVersion, NewVersion, TenantId};
use contentvc_core::VersionControl;

use super::{read_body, style, truncate};

pub fn cmd_create(
    vc: &VersionControl,
    tenant: TenantId,
    content_id: i64,
    author_id: i64,
    file: &Path,
    tags: Vec<String>,
) -> Result<()> {
    let body = read_body(file)?;
    let version = vc
        .commit_version(
            tenant,
            NewVersion::new(content_id, body, author_id).with_tags(tags),
        )
        .context("failed to create version")?;

    println!(
        "{}",
        style::success(&format!(
            "Created version {} (#{}) of content {}",
            version.id, version.version_number, version.content_id
        ))
    );
    Ok(())
}

pub fn cmd_list(vc: &VersionControl, tenant: TenantId, content_id: i64) -> Result<()> {
    let versions = vc
        .list_versions(tenant, content_id)
        .context("failed to list versions")?;

    if versions.is_empty() {
        println!("{}", style::dim("No versions found."));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["", "#", "ID", "Author", "Created", "Tags", "Restored from"]);

    for v in &versions {
        table.add_row(vec![
            Cell::new(style::current_marker(v.is_current)),
            Cell::new(v.version_number),
            Cell::new(v.id),
            Cell::new(v.author_id),
            Cell::new(v.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(join_tags(v)),
            Cell::new(
                v.restored_from
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }

    println!("{table}");
    println!("{} version(s)", versions.len());
    Ok(())
}

pub fn cmd_show(vc: &VersionControl, tenant: TenantId, id: i64, with_body: bool) -> Result<()> {
    let version = vc.get_version(tenant, id).context("failed to fetch version")?;
    print_version(&version, with_body);
    Ok(())
}

pub fn cmd_current(vc: &VersionControl, tenant: TenantId, content_id: i64) -> Result<()> {
    let version = vc
        .get_current(tenant, content_id)
        .context("failed to fetch current version")?;
    print_version(&version, true);
    Ok(())
}

fn print_version(v: &ContentVersion, with_body: bool) {
    let title = format!("Version {} (#{} of content {})", v.id, v.version_number, v.content_id);
    println!("{}", style::header(&title));
    println!("{}", "=".repeat(title.chars().count()));
    println!();
    println!("  Current      : {}", if v.is_current { "yes" } else { "no" });
    println!("  Author       : {}", v.author_id);
    println!("  Created at   : {}", v.created_at.to_rfc3339());
    println!("  Body hash    : {}", v.body_hash);
    println!("  Size         : {} bytes", v.body.len());
    println!("  Tags         : {}", join_tags(v));
    if let Some(source) = v.restored_from {
        println!("  Restored from: {}", source);
    }

    if with_body {
        println!();
        println!("{}", "-".repeat(40));
        print!("{}", v.body);
        if !v.body.is_empty() && !v.body.ends_with('\n') {
            println!();
        }
    }
}

fn join_tags(v: &ContentVersion) -> String {
    if v.tags.is_empty() {
        "-".to_string()
    } else {
        v.tags.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

pub fn cmd_restore(
    vc: &VersionControl,
    tenant: TenantId,
    id: i64,
    restored_by: i64,
    notes: Option<String>,
) -> Result<()> {
    let outcome = vc
        .restore(tenant, id, restored_by, notes)
        .context("failed to restore version")?;

    println!(
        "{}",
        style::success(&format!(
            "Restored version {} as version {} (#{}) of content {}",
            outcome.record.version_id,
            outcome.version.id,
            outcome.version.version_number,
            outcome.version.content_id
        ))
    );
    Ok(())
}

pub fn cmd_restores(vc: &VersionControl, tenant: TenantId, content_id: i64) -> Result<()> {
    let records = vc
        .list_restores(tenant, content_id)
        .context("failed to list restores")?;

    if records.is_empty() {
        println!("{}", style::dim("No restores recorded."));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["ID", "Restored", "New version", "By", "At", "Notes"]);

    for r in &records {
        table.add_row(vec![
            Cell::new(r.id),
            Cell::new(r.version_id),
            Cell::new(r.new_version_id),
            Cell::new(r.restored_by),
            Cell::new(r.restored_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            Cell::new(truncate(r.notes.as_deref().unwrap_or(""), 40)),
        ]);
    }

    println!("{table}");
    println!("{} restore(s)", records.len());
    Ok(())
}

pub fn cmd_audit(db: &Database, tenant: TenantId, limit: u32) -> Result<()> {
    let entries = db
        .list_audit_log(tenant, limit)
        .context("failed to list audit entries")?;

    if entries.is_empty() {
        println!("{}", style::dim("No audit log entries found."));
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Timestamp", "Action", "Content", "Version", "Actor", "Details"]);

    let optional = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    for e in &entries {
        let action = if e.action == "tenant_mismatch" {
            style::warn(&e.action)
        } else {
            e.action.clone()
        };
        table.add_row(vec![
            Cell::new(&e.created_at),
            Cell::new(action),
            Cell::new(optional(e.content_id)),
            Cell::new(optional(e.version_id)),
            Cell::new(optional(e.actor_id)),
            Cell::new(truncate(e.details.as_deref().unwrap_or(""), 50)),
        ]);
    }

    println!("{table}");
    println!("{} entries shown", entries.len());
    Ok(())
}
