use crate::config::Settings;
use crate::insights::aggregate::{InsightsOptions, compute_insights, group_by, insights_for};
use crate::insights::types::{InsightsReport, ProjectIndex, ProjectIndexEntry, Repartition};
use crate::model::{DeliveryBox, Stage};
use crate::output::write_json;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// Computes insights with one blocking task per project.
///
/// Boxes share no state, so projects are aggregated independently, at most
/// `concurrency` at a time. Ungrouped requests run as a single task.
#[tracing::instrument(skip(boxes, options, settings), fields(box_count = boxes.len(), grouped = options.grouped))]
pub async fn analyze(
    boxes: Vec<DeliveryBox>,
    options: InsightsOptions,
    settings: Settings,
    now: DateTime<Utc>,
    concurrency: usize,
) -> Result<InsightsReport> {
    if !options.grouped || boxes.is_empty() {
        let report = tokio::task::spawn_blocking(move || {
            compute_insights(&boxes, &options, &settings, now)
        })
        .await?;
        return Ok(report);
    }

    let groups: Vec<(String, Vec<DeliveryBox>)> = group_by(&boxes, |b| b.project.clone())
        .into_iter()
        .filter(|(project, _)| options.selects(project))
        .map(|(project, sample)| (project, sample.into_iter().cloned().collect()))
        .collect();

    info!(groups = groups.len(), concurrency, "Aggregating projects");

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(groups.len());

    for (project, sample) in groups {
        let sem = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = sem.acquire_owned().await?;
            let insights = tokio::task::spawn_blocking(move || {
                let insights = insights_for(&sample, &settings, now);
                debug!(project = %project, boxes = sample.len(), "Project aggregated");
                (project, insights)
            })
            .await?;
            anyhow::Ok(insights)
        }));
    }

    let mut report = BTreeMap::new();
    for task in tasks {
        let (project, insights) = task.await??;
        report.insert(project, insights);
    }

    Ok(InsightsReport::Grouped(report))
}

/// Builds the per-project summary listing.
pub fn project_index(report: &InsightsReport, generated_at: DateTime<Utc>) -> ProjectIndex {
    let entry = |project: &str, repartition: &Repartition| ProjectIndexEntry {
        project: project.to_string(),
        total: repartition.total,
        validated: repartition.validated,
        validated_percent: repartition.share(Stage::Validated),
    };

    let projects = match report {
        InsightsReport::Grouped(groups) => groups
            .iter()
            .map(|(project, insights)| entry(project, &insights.repartition))
            .collect(),
        InsightsReport::Flat(insights) => vec![entry("all", &insights.repartition)],
    };

    ProjectIndex {
        generated_at,
        projects,
    }
}

/// Keeps group names usable as file names.
fn file_stem(project: &str) -> String {
    let stem: String = project
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() { "_".to_string() } else { stem }
}

/// Writes one JSON file per project plus `index.json` under `out_dir`.
pub fn write_report(out_dir: &Path, report: &InsightsReport, generated_at: DateTime<Utc>) -> Result<()> {
    match report {
        InsightsReport::Grouped(groups) => {
            for (project, insights) in groups {
                let path = out_dir.join("projects").join(format!("{}.json", file_stem(project)));
                write_json(&path, insights)?;
            }
        }
        InsightsReport::Flat(insights) => write_json(&out_dir.join("all.json"), insights)?,
    }

    let index = project_index(report, generated_at);
    write_json(&out_dir.join("index.json"), &index)?;

    info!(out_dir = %out_dir.display(), entries = index.projects.len(), "Insights written");
    Ok(())
}
