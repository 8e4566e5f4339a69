use crate::analyze::Aggregated;
use crate::model::{Error, Result, DATE_FORMAT};
use crate::report::{merged_by_repository, ReportContext};
use rust_xlsxwriter::{DocProperties, Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

const MAX_SHEET_NAME: usize = 31;
const FORBIDDEN_SHEET_CHARS: [char; 7] = ['[', ']', ':', '*', '?', '/', '\\'];
const EMPTY_SHEET_NAME: &str = "Pull Requests";
const UNKNOWN_AUTHOR: &str = "Unknown";

/// Writes one worksheet per repository with merged pull requests.
pub fn generate(aggregated: &Aggregated, context: &ReportContext, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let properties = DocProperties::new().set_author("merged-pr-report");
    workbook.set_properties(&properties);

    let bold_format = Format::new().set_bold();
    let groups = merged_by_repository(aggregated);
    let mut used_names = HashSet::new();

    for group in &groups {
        let name = sheet_name(group.verticals, group.repository, &mut used_names);
        let worksheet = workbook.add_worksheet().set_name(&name)?;
        write_header(worksheet, &bold_format)?;

        for (row, item) in (1u32..).zip(&group.items) {
            let Some(merged_at) = item.record.merged_at else {
                continue;
            };
            let number = item.record.number;
            let url = context.host.pull_url(group.repository, number);
            worksheet.write_url_with_text(row, 0, url.as_str(), &format!("#{number}"))?;
            let author = item.record.author_login.as_deref().unwrap_or(UNKNOWN_AUTHOR);
            let created_at = item.record.created_at;
            worksheet.write_string(row, 1, author)?;
            worksheet.write_string(row, 2, &merged_at.format(DATE_FORMAT).to_string())?;
            worksheet.write_string(row, 3, &created_at.format(DATE_FORMAT).to_string())?;
        }
        worksheet.set_freeze_panes(1, 0)?;
        worksheet.autofit();
    }

    if groups.is_empty() {
        let worksheet = workbook.add_worksheet().set_name(EMPTY_SHEET_NAME)?;
        write_header(worksheet, &bold_format)?;
    }

    let data = workbook.save_to_buffer()?;
    fs::write(path, data).map_err(|source| Error::ReportWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn write_header(worksheet: &mut Worksheet, format: &Format) -> Result<()> {
    worksheet.write_string_with_format(0, 0, "PR_Number", format)?;
    worksheet.write_string_with_format(0, 1, "Author", format)?;
    worksheet.write_string_with_format(0, 2, "Merge_Date", format)?;
    worksheet.write_string_with_format(0, 3, "Created_Date", format)?;
    Ok(())
}

/// `"<verticals> - <repo name>"`, cleaned up for Excel and unique in the workbook.
fn sheet_name(verticals: &[String], repository: &str, used: &mut HashSet<String>) -> String {
    let repo_name = repository.rsplit('/').next().unwrap_or(repository);
    let raw = if verticals.is_empty() {
        repo_name.to_string()
    } else {
        format!("{} - {repo_name}", verticals.join("-"))
    };
    let cleaned = raw
        .chars()
        .map(|c| if FORBIDDEN_SHEET_CHARS.contains(&c) { '-' } else { c })
        .collect::<String>();
    let cleaned = cleaned.trim_matches('\'').trim();
    let base = if cleaned.is_empty() { EMPTY_SHEET_NAME } else { cleaned };

    let mut candidate = truncate(base, MAX_SHEET_NAME);
    let mut suffix = 2;
    // Excel compares sheet names case-insensitively.
    while used.contains(&candidate.to_lowercase()) {
        let tail = format!(" ({suffix})");
        candidate = format!("{}{tail}", truncate(base, MAX_SHEET_NAME - tail.chars().count()));
        suffix += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect::<String>().trim_end().to_string()
}
