//! Templates sidebar.
//!
//! Lists templates grouped by update date, newest group first, as a
//! navigable tree. Selection moves across template rows only; date headers
//! are skipped.

use chrono::NaiveDate;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use scribe_protocol::TemplateSummary;

enum Row {
    Header(String),
    /// Index into `templates`.
    Item(usize),
}

/// State of the templates side menu.
#[derive(Default)]
pub struct TemplatesSidebar {
    templates: Vec<TemplateSummary>,
    rows: Vec<Row>,
    /// Position in `rows`; always an `Item` row when templates exist.
    cursor: usize,
    pub loading: bool,
    pub error: Option<String>,
}

impl TemplatesSidebar {
    pub fn new() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    /// Replace the template list and rebuild the date groups.
    pub fn set_templates(&mut self, mut templates: Vec<TemplateSummary>) {
        self.loading = false;
        self.error = None;
        templates.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        self.rows.clear();
        let mut current_date: Option<NaiveDate> = None;
        for (i, template) in templates.iter().enumerate() {
            let date = template.updated_at.date_naive();
            if current_date != Some(date) {
                current_date = Some(date);
                self.rows
                    .push(Row::Header(date.format("%b %d, %Y").to_string()));
            }
            self.rows.push(Row::Item(i));
        }
        self.templates = templates;
        self.cursor = self.first_item_row().unwrap_or(0);
    }

    pub fn set_error(&mut self, message: String) {
        self.loading = false;
        self.error = Some(message);
    }

    /// The template under the cursor.
    pub fn selected(&self) -> Option<&TemplateSummary> {
        match self.rows.get(self.cursor) {
            Some(Row::Item(i)) => self.templates.get(*i),
            _ => None,
        }
    }

    pub fn select_next(&mut self) {
        if let Some(next) = self.find_item(self.cursor + 1, 1) {
            self.cursor = next;
        }
    }

    pub fn select_prev(&mut self) {
        if self.cursor == 0 {
            return;
        }
        if let Some(prev) = self.find_item(self.cursor - 1, -1) {
            self.cursor = prev;
        }
    }

    fn first_item_row(&self) -> Option<usize> {
        self.find_item(0, 1)
    }

    /// Scan from `start` in `step` direction for the nearest item row.
    fn find_item(&self, start: usize, step: i64) -> Option<usize> {
        let mut idx = start as i64;
        while idx >= 0 && (idx as usize) < self.rows.len() {
            if matches!(self.rows.get(idx as usize), Some(Row::Item(_))) {
                return Some(idx as usize);
            }
            idx += step;
        }
        None
    }

    /// Render the menu rows.
    pub fn lines(&self, focused: bool) -> Vec<Line<'static>> {
        if self.loading {
            return vec![Line::from(Span::styled(
                "loading templates…",
                Style::default().fg(Color::DarkGray),
            ))];
        }
        if let Some(err) = &self.error {
            return vec![Line::from(Span::styled(
                format!("Error loading templates: {err}"),
                Style::default().fg(Color::Red),
            ))];
        }
        if self.templates.is_empty() {
            return vec![Line::from(Span::styled(
                "no templates",
                Style::default().fg(Color::DarkGray),
            ))];
        }

        self.rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| match row {
                Row::Header(label) => Line::from(Span::styled(
                    label.clone(),
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD),
                )),
                Row::Item(i) => {
                    let name = self
                        .templates
                        .get(*i)
                        .map(|t| t.name.clone())
                        .unwrap_or_default();
                    let mut style = Style::default();
                    if row_idx == self.cursor {
                        style = style.add_modifier(Modifier::REVERSED);
                        if focused {
                            style = style.fg(Color::Cyan);
                        }
                    }
                    Line::from(Span::styled(format!("  {name}"), style))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn template(id: &str, name: &str, day: u32) -> TemplateSummary {
        TemplateSummary {
            id: id.to_string(),
            name: name.to_string(),
            updated_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
            linked_prompt: String::new(),
        }
    }

    #[test]
    fn test_groups_by_date_newest_first() {
        let mut sidebar = TemplatesSidebar::new();
        sidebar.set_templates(vec![
            template("t-1", "Old", 1),
            template("t-2", "New", 5),
            template("t-3", "Also new", 5),
        ]);

        let lines: Vec<String> = sidebar
            .lines(false)
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect();
        assert_eq!(
            lines,
            vec![
                "Mar 05, 2025",
                "  New",
                "  Also new",
                "Mar 01, 2025",
                "  Old",
            ]
        );
    }

    #[test]
    fn test_navigation_skips_headers() {
        let mut sidebar = TemplatesSidebar::new();
        sidebar.set_templates(vec![template("t-1", "A", 5), template("t-2", "B", 1)]);

        assert_eq!(sidebar.selected().map(|t| t.id.as_str()), Some("t-1"));
        sidebar.select_next();
        assert_eq!(sidebar.selected().map(|t| t.id.as_str()), Some("t-2"));
        sidebar.select_next();
        assert_eq!(sidebar.selected().map(|t| t.id.as_str()), Some("t-2"));
        sidebar.select_prev();
        assert_eq!(sidebar.selected().map(|t| t.id.as_str()), Some("t-1"));
        sidebar.select_prev();
        assert_eq!(sidebar.selected().map(|t| t.id.as_str()), Some("t-1"));
    }

    #[test]
    fn test_error_state_renders() {
        let mut sidebar = TemplatesSidebar::new();
        sidebar.set_error("backend down".to_string());
        let text: String = sidebar
            .lines(false)
            .iter()
            .flat_map(|l| l.spans.iter())
            .map(|s| s.content.as_ref())
            .collect();
        assert!(text.contains("backend down"));
        assert!(sidebar.selected().is_none());
    }
}
