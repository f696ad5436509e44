//! Comparison, merge and resolution subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use contentvc_core::conflict::{find_conflict_blocks, ConflictResolver, MergeOptions, Resolution};
use contentvc_core::diff::{Change, DiffResult};
use contentvc_core::models::TenantId;
use contentvc_core::VersionControl;

use super::style;

pub struct MergeArgs {
    pub ours: i64,
    pub theirs: i64,
    pub base: Option<i64>,
    pub include_additions: bool,
    pub exclude_deletions: bool,
    pub output: Option<PathBuf>,
}

pub fn cmd_diff(
    vc: &VersionControl,
    tenant: TenantId,
    from: i64,
    to: i64,
    unified: bool,
    json: bool,
) -> Result<()> {
    if unified {
        let a = vc.get_version(tenant, from).context("failed to fetch version")?;
        let b = vc.get_version(tenant, to).context("failed to fetch version")?;
        let patch = vc
            .diff_engine()
            .unified(&a.body, &b.body)
            .context("failed to render patch")?;
        print!("{}", patch);
        return Ok(());
    }

    let diff = vc.compare(tenant, from, to).context("failed to compare versions")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&*diff)?);
        return Ok(());
    }

    print_changes(&diff);
    Ok(())
}

fn print_changes(diff: &DiffResult) {
    if diff.is_identical() {
        println!("{}", style::dim("Versions are identical."));
        return;
    }

    for change in &diff.changes {
        match change {
            Change::Unchanged { lines, old_range, .. } => {
                println!(
                    "{}",
                    style::dim(&format!("  {} unchanged line(s) at {}", lines.len(), old_range))
                );
            }
            Change::Insert {
                new_content,
                new_range,
                after_old_line,
            } => {
                println!(
                    "{}",
                    style::header(&format!("@@ insert {} after old line {}", new_range, after_old_line))
                );
                print_lines(new_content, style::added);
            }
            Change::Delete {
                old_content,
                old_range,
                ..
            } => {
                println!("{}", style::header(&format!("@@ delete {}", old_range)));
                print_lines(old_content, style::removed);
            }
            Change::Modify {
                old_content,
                new_content,
                old_range,
                new_range,
            } => {
                println!(
                    "{}",
                    style::header(&format!("@@ modify {} -> {}", old_range, new_range))
                );
                print_lines(old_content, style::removed);
                print_lines(new_content, style::added);
            }
        }
    }

    let summary = diff.summary();
    println!();
    println!(
        "{} region(s) changed: +{} -{} ({} unchanged)",
        summary.changed_regions, summary.inserted_lines, summary.deleted_lines, summary.unchanged_lines
    );
}

fn print_lines(lines: &[String], render: fn(&str) -> String) {
    for line in lines {
        let text = line.strip_suffix('\n').unwrap_or(line);
        let text = text.strip_suffix('\r').unwrap_or(text);
        println!("{}", render(text));
    }
}

pub fn cmd_merge(vc: &VersionControl, tenant: TenantId, args: MergeArgs) -> Result<()> {
    let options = MergeOptions {
        include_additions: args.include_additions,
        exclude_deletions: args.exclude_deletions,
    };
    let result = vc
        .merge_versions(tenant, args.ours, args.theirs, args.base, options)
        .context("failed to merge versions")?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &result.merged_body)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "{}",
                style::success(&format!("Merged body written to {}", path.display()))
            );
        }
        None => print!("{}", result.merged_body),
    }

    if result.has_conflicts() {
        eprintln!(
            "{}",
            style::warn(&format!(
                "{} conflict(s) need resolving before the body can be saved",
                result.conflicts.len()
            ))
        );
        for marker in &result.conflict_markers {
            eprintln!("  lines {}-{}", marker.start_line, marker.end_line);
        }
    }
    Ok(())
}

pub fn cmd_resolve(file: &Path, strategy: &str) -> Result<()> {
    let resolution: Resolution = strategy.parse().map_err(anyhow::Error::msg)?;
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let blocks = find_conflict_blocks(&body).len();
    if blocks == 0 {
        println!("{}", style::warn("No conflict markers found; file left unchanged."));
        return Ok(());
    }

    let resolved =
        ConflictResolver::resolve_all(&body, &resolution).context("failed to resolve conflicts")?;
    std::fs::write(file, resolved).with_context(|| format!("failed to write {}", file.display()))?;

    println!(
        "{}",
        style::success(&format!(
            "Resolved {} conflict(s) in {} using '{}'",
            blocks,
            file.display(),
            strategy
        ))
    );
    Ok(())
}
