use crate::analyze::Aggregated;
use crate::model::{Error, Result, DATE_FORMAT};
use crate::report::{merged_by_repository, Host, RepositoryGroup, ReportContext};
use itertools::Itertools;
use markdown_builder::{List, ListItem, Markdown};
use markdown_table::{Heading, HeadingAlignment, MarkdownTable};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const UNASSIGNED: &str = "Unassigned";

pub trait MarkdownReport {
    fn report_render(&self, context: &ReportContext) -> Result<String>;

    fn report_create(&self, path: &Path, context: &ReportContext) -> Result<()> {
        let text = self.report_render(context)?;
        fs::write(path, text).map_err(|source| Error::ReportWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl MarkdownReport for Aggregated {
    fn report_render(&self, context: &ReportContext) -> Result<String> {
        let mut doc = Markdown::new();
        let groups = merged_by_repository(self);

        doc.header1("Merged Pull Request Analysis Report");
        doc.paragraph(format!(
            "**Generated:** {}",
            context.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        doc.add_summary(self, &groups);
        if groups.iter().any(|group| !group.verticals.is_empty()) {
            doc.add_vertical_table(&groups)?;
        }
        doc.paragraph("---".to_string());

        if groups.is_empty() {
            doc.paragraph("No pull requests found matching the criteria.".to_string());
        }
        for group in &groups {
            doc.add_repository(group, &context.host);
        }
        Ok(doc.render())
    }
}

trait MarkdownExt {
    fn add_summary(&mut self, aggregated: &Aggregated, groups: &[RepositoryGroup<'_>]);
    fn add_vertical_table(&mut self, groups: &[RepositoryGroup<'_>]) -> Result<()>;
    fn add_repository(&mut self, group: &RepositoryGroup<'_>, host: &Host);
}

impl MarkdownExt for Markdown {
    fn add_summary(&mut self, aggregated: &Aggregated, groups: &[RepositoryGroup<'_>]) {
        self.header2("Summary");
        let merged: usize = groups.iter().map(|group| group.items.len()).sum();
        self.list(
            List::builder()
                .append(format!("**Total Repositories with Merged PRs:** {}", groups.len()))
                .append(format!("**Total Merged Pull Requests:** {merged}"))
                .append(format!(
                    "**Repositories Processed:** {} succeeded, {} failed",
                    aggregated.success_count, aggregated.failure_count
                ))
                .unordered(),
        );
    }

    fn add_vertical_table(&mut self, groups: &[RepositoryGroup<'_>]) -> Result<()> {
        // vertical -> (repositories, merged pull requests)
        let mut totals: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for group in groups {
            let names = if group.verticals.is_empty() {
                vec![UNASSIGNED]
            } else {
                group.verticals.iter().map(String::as_str).unique().collect()
            };
            for name in names {
                let entry = totals.entry(name).or_default();
                entry.0 += 1;
                entry.1 += group.items.len();
            }
        }

        let header = vec![
            Heading::new("Vertical".to_string(), None),
            Heading::new("Repositories".to_string(), Some(HeadingAlignment::Right)),
            Heading::new("Merged PRs".to_string(), Some(HeadingAlignment::Right)),
        ];
        let table = totals
            .into_iter()
            .map(|(name, (repositories, merged))| {
                vec![name.to_string(), repositories.to_string(), merged.to_string()]
            })
            .collect::<Vec<_>>();

        let mut md_table = MarkdownTable::new(table);
        md_table.with_headings(header);

        let table = md_table
            .as_markdown()
            .map_err(|e| Error::Render(format!("{e:?}")))?;

        self.header2("Verticals");
        // Paragraphs wrap long lines, the table goes in verbatim.
        self.elements.push(table.into());
        Ok(())
    }

    fn add_repository(&mut self, group: &RepositoryGroup<'_>, host: &Host) {
        self.header2(group.repository);
        if !group.verticals.is_empty() {
            self.paragraph(format!("*Verticals:* {}", group.verticals.join(", ")));
        }

        let items: Vec<ListItem> = group
            .items
            .iter()
            .filter_map(|item| {
                let merged_at = item.record.merged_at?;
                let number = item.record.number;
                let author = item
                    .record
                    .author_login
                    .as_ref()
                    .map(|login| format!(" by **{login}**"))
                    .unwrap_or_default();
                Some(format!(
                    "[#{number}]({}) {}{author} - merged {}",
                    host.pull_url(group.repository, number),
                    item.record.title,
                    merged_at.format(DATE_FORMAT)
                ))
            })
            .map(Into::into)
            .collect();
        self.list(List::unordered_with(items));
        self.paragraph("---".to_string());
    }
}
