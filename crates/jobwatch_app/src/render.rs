use std::fmt::Write as _;

use jobwatch_core::{ListStatus, ListViewModel, NoticeView, Page, PageLink};
use jobwatch_engine::{AlertSummary, AnalysisDetail};

/// Latest known state of the alerts feed, shown under the job list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlertsLine {
    pub total: Option<u64>,
    pub high_on_page: usize,
    pub error: Option<String>,
}

impl AlertsLine {
    pub fn from_page(page: &Page<AlertSummary>) -> Self {
        Self {
            total: Some(page.total_items),
            high_on_page: page
                .items
                .iter()
                .filter(|alert| is_high_severity(&alert.severity))
                .count(),
            error: None,
        }
    }
}

fn is_high_severity(severity: &str) -> bool {
    severity.eq_ignore_ascii_case("high") || severity.eq_ignore_ascii_case("critical")
}

pub fn render_list(view: &ListViewModel, alerts: &AlertsLine) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} [{}] ==", view.resource_key, status_text(view.status));

    if view.rows.is_empty() && view.status == ListStatus::Ready {
        out.push_str("  (no jobs)\n");
    }
    let label_width = view
        .rows
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or(0);
    for row in &view.rows {
        let _ = writeln!(
            out,
            "  {:<label_width$}  {:<10}  {}",
            row.label, row.status, row.job_id
        );
    }

    if let Some(summary) = &view.summary {
        let _ = writeln!(out, "{summary}");
    }
    if !view.links.is_empty() {
        let _ = writeln!(out, "Pages: {}", pagination_bar(&view.links));
    }
    if let Some(error) = &view.error {
        let _ = writeln!(out, "! {error}");
    }

    match (&alerts.total, &alerts.error) {
        (_, Some(error)) => {
            let _ = writeln!(out, "Alerts: unavailable ({error})");
        }
        (Some(total), None) => {
            let _ = writeln!(
                out,
                "Alerts: {total} total, {} high severity on the first page",
                alerts.high_on_page
            );
        }
        (None, None) => {}
    }

    if let Some(notice) = &view.notice {
        out.push_str(&notice_prompt(notice));
    }
    if let Some(job_id) = &view.navigating_to {
        let _ = writeln!(out, "Opening {job_id}...");
    }
    out
}

fn status_text(status: ListStatus) -> &'static str {
    match status {
        ListStatus::Idle => "idle",
        ListStatus::Loading => "loading",
        ListStatus::Ready => "ready",
        ListStatus::Refetching => "refreshing",
        ListStatus::AccessDenied => "access denied",
        ListStatus::Failed => "error",
    }
}

pub fn pagination_bar(links: &[PageLink]) -> String {
    links
        .iter()
        .map(|link| match link {
            PageLink::Page {
                number,
                current: true,
            } => format!("[{number}]"),
            PageLink::Page { number, .. } => number.to_string(),
            PageLink::Ellipsis => "…".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn notice_prompt(notice: &NoticeView) -> String {
    let mut out = format!(
        ">> {} finished: {} (at {})",
        notice.label,
        notice.status,
        notice.observed_at.format("%H:%M:%S")
    );
    if notice.pending_behind > 0 {
        let _ = write!(out, ", {} more waiting", notice.pending_behind);
    }
    out.push_str("\n   g: open it   d: dismiss\n");
    out
}

pub fn render_detail(detail: &AnalysisDetail) -> String {
    let summary = &detail.summary;
    let mut out = String::new();
    let _ = writeln!(out, "-- {} ({}) --", summary.display_label(), summary.id);
    let status = summary
        .parsed_status()
        .map_or_else(|| "Unknown".to_string(), |status| status.to_string());
    let _ = writeln!(out, "status:   {status}");
    let _ = writeln!(out, "packets:  {}", summary.total_packets);
    let _ = writeln!(out, "streams:  {}", summary.total_streams);
    let _ = writeln!(out, "duration: {:.2}s", summary.duration);
    if let Some(analyzed_at) = &summary.analyzed_at {
        let _ = writeln!(out, "analyzed: {analyzed_at}");
    }
    for stream in &detail.streams {
        let preview = stream.preview.as_deref().unwrap_or("");
        let _ = writeln!(out, "  #{:<4} {}", stream.stream_number, preview);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jobwatch_core::{page_links, JobId, JobRowView, ResourceKey};
    use pretty_assertions::assert_eq;

    fn view() -> ListViewModel {
        ListViewModel {
            resource_key: ResourceKey::new("analyses"),
            status: ListStatus::Ready,
            rows: vec![
                JobRowView {
                    job_id: JobId::new("a-1"),
                    label: "capture.pcap".to_string(),
                    status: "Completed".to_string(),
                },
                JobRowView {
                    job_id: JobId::new("a-2"),
                    label: "Analysis a-2".to_string(),
                    status: "Processing".to_string(),
                },
            ],
            page: 1,
            total_items: 4,
            total_pages: 2,
            links: page_links(1, 2),
            summary: Some("Showing 2 of 4 items. Page 1 of 2.".to_string()),
            error: None,
            is_fetching: false,
            notice: None,
            navigating_to: None,
        }
    }

    #[test]
    fn renders_rows_summary_and_pages() {
        let text = render_list(&view(), &AlertsLine::default());
        assert_eq!(
            text,
            "== analyses [ready] ==\n\
             \x20 capture.pcap  Completed   a-1\n\
             \x20 Analysis a-2  Processing  a-2\n\
             Showing 2 of 4 items. Page 1 of 2.\n\
             Pages: [1] 2\n"
        );
    }

    #[test]
    fn notice_prompt_counts_waiting_notices() {
        let mut view = view();
        view.notice = Some(NoticeView {
            job_id: JobId::new("a-1"),
            label: "capture.pcap".to_string(),
            status: "Completed".to_string(),
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap(),
            pending_behind: 2,
        });
        let text = render_list(&view, &AlertsLine::default());
        assert!(text.ends_with(
            ">> capture.pcap finished: Completed (at 12:30:05), 2 more waiting\n   g: open it   d: dismiss\n"
        ));
    }

    #[test]
    fn errors_and_alerts_are_shown() {
        let mut view = view();
        view.status = ListStatus::AccessDenied;
        view.error = Some("access denied: unauthorized (401)".to_string());
        let alerts = AlertsLine {
            total: Some(7),
            high_on_page: 3,
            error: None,
        };
        let text = render_list(&view, &alerts);
        assert!(text.starts_with("== analyses [access denied] =="));
        assert!(text.contains("! access denied: unauthorized (401)\n"));
        assert!(text.contains("Alerts: 7 total, 3 high severity on the first page\n"));
    }

    fn alert(id: &str, severity: &str) -> AlertSummary {
        AlertSummary {
            id: id.to_string(),
            analysis_id: None,
            alert_type: "port_scan".to_string(),
            severity: severity.to_string(),
            src_ip: None,
            dst_ip: None,
            port: None,
            protocol: None,
        }
    }

    #[test]
    fn alerts_line_counts_high_and_critical_on_the_page() {
        let page = Page::new(
            vec![
                alert("1", "low"),
                alert("2", "HIGH"),
                alert("3", "medium"),
                alert("4", "Critical"),
            ],
            42,
            1,
            4,
        );
        let line = AlertsLine::from_page(&page);
        assert_eq!(
            line,
            AlertsLine {
                total: Some(42),
                high_on_page: 2,
                error: None,
            }
        );

        let failed = AlertsLine {
            error: Some("network error: refused".to_string()),
            ..line
        };
        let text = render_list(&view(), &failed);
        assert!(text.contains("Alerts: unavailable (network error: refused)\n"));
    }

    #[test]
    fn pagination_bar_marks_current_page() {
        assert_eq!(pagination_bar(&page_links(5, 10)), "1 … 4 [5] 6 … 10");
        assert_eq!(pagination_bar(&page_links(1, 1)), "");
    }
}
