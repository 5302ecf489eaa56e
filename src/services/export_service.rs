use crate::error::Result;
use crate::models::assessment::Assessment;
use crate::models::attempt::{AttemptStatus, StudentAttempt};
use crate::services::report_service::score_summary;
use crate::utils::time::format_time_spent;
use rust_xlsxwriter::*;

pub struct ExportService;

impl ExportService {
    /// Styled results workbook for one assessment; `attempts` is written in
    /// the given order (ranked by the caller).
    pub fn generate_results_xlsx(assessment: &Assessment, attempts: &[StudentAttempt]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Results")?;

        // ── Color palette ──
        let primary_color = Color::RGB(0x1E293B);
        let header_bg = Color::RGB(0x0F172A);
        let header_text = Color::White;
        let alt_row_1 = Color::RGB(0xF8FAFC);
        let alt_row_2 = Color::White;
        let border_color = Color::RGB(0xE2E8F0);

        let status_submitted = Color::RGB(0x10B981);
        let status_auto = Color::RGB(0xF59E0B);
        let status_expired = Color::RGB(0xEF4444);
        let status_open = Color::RGB(0x3B82F6);

        let pct_high = Color::RGB(0x10B981);
        let pct_mid = Color::RGB(0xF59E0B);
        let pct_low = Color::RGB(0xEF4444);

        // ── Column definitions ──
        let columns = [
            ("Rank", 8.0),
            ("Student", 28.0),
            ("Attempt", 10.0),
            ("Status", 16.0),
            ("Score", 10.0),
            ("Total", 10.0),
            ("Percentage", 12.0),
            ("Time spent", 14.0),
            ("Tab switches", 14.0),
            ("Fullscreen exits", 16.0),
            ("Started", 20.0),
            ("Submitted", 20.0),
        ];
        let last_col = (columns.len() - 1) as u16;

        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        // ── Title row ──
        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(header_text)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(0, 40)?;
        worksheet.merge_range(0, 0, 0, last_col, &format!("{} results", assessment.title), &title_format)?;

        // ── Subtitle row ──
        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);

        worksheet.set_row_height(1, 22)?;
        let exported_at = chrono::Utc::now().format("%d.%m.%Y %H:%M UTC").to_string();
        let subtitle_text = format!(
            "{} • {} / {} • Exported {} • {} attempts",
            assessment.assessment_type.as_str(),
            assessment.college,
            assessment.branch,
            exported_at,
            attempts.len()
        );
        worksheet.merge_range(1, 0, 1, last_col, &subtitle_text, &subtitle_format)?;

        // ── Header row ──
        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(header_text)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_text_wrap()
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let header_row = 2;
        worksheet.set_row_height(header_row, 30)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        // ── Data rows ──
        let data_start_row = 3;
        for (idx, attempt) in attempts.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { alt_row_1 } else { alt_row_2 };

            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);

            worksheet.set_row_height(row, 22)?;
            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &attempt.student_id, &base_fmt.clone().set_bold())?;
            worksheet.write_number_with_format(row, 2, attempt.attempt_number as f64, &center_fmt)?;

            let status_color = match attempt.status {
                AttemptStatus::Submitted => status_submitted,
                AttemptStatus::AutoSubmitted => status_auto,
                AttemptStatus::Expired => status_expired,
                AttemptStatus::InProgress => status_open,
            };
            let status_fmt = Format::new()
                .set_font_size(10)
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(status_color)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            worksheet.write_string_with_format(row, 3, attempt.status.as_str(), &status_fmt)?;

            worksheet.write_number_with_format(row, 4, attempt.score as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 5, attempt.total_marks as f64, &center_fmt)?;

            let pct = attempt.percentage;
            let pct_color = if pct >= 70 { pct_high } else if pct >= 40 { pct_mid } else { pct_low };
            let pct_fmt = center_fmt.clone().set_bold().set_font_color(pct_color);
            worksheet.write_number_with_format(row, 6, pct as f64, &pct_fmt)?;

            let spent = attempt
                .time_spent_seconds()
                .map(format_time_spent)
                .unwrap_or_else(|| "—".to_string());
            worksheet.write_string_with_format(row, 7, &spent, &center_fmt)?;

            worksheet.write_number_with_format(row, 8, attempt.tab_switches as f64, &center_fmt)?;
            worksheet.write_number_with_format(row, 9, attempt.fullscreen_exits as f64, &center_fmt)?;

            let started = attempt.start_time.format("%d.%m.%Y %H:%M").to_string();
            worksheet.write_string_with_format(row, 10, &started, &center_fmt)?;
            let submitted = attempt
                .submit_time
                .or(attempt.end_time)
                .map(|d| d.format("%d.%m.%Y %H:%M").to_string())
                .unwrap_or_else(|| "—".to_string());
            worksheet.write_string_with_format(row, 11, &submitted, &center_fmt)?;
        }

        // ── Summary row ──
        let total_row = data_start_row + attempts.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);

        let summary = score_summary(attempts);
        worksheet.set_row_height(total_row, 26)?;
        worksheet.merge_range(total_row, 0, total_row, 2, &format!("Total: {} attempts", attempts.len()), &summary_fmt)?;

        let auto_count = attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::AutoSubmitted)
            .count();
        let expired_count = attempts
            .iter()
            .filter(|a| a.status == AttemptStatus::Expired)
            .count();
        let status_summary = format!("Auto-submitted: {} | Expired: {}", auto_count, expired_count);
        worksheet.merge_range(total_row, 3, total_row, 5, &status_summary, &summary_fmt)?;

        let score_text = format!(
            "Avg score: {:.2} | Avg %: {:.2} | Min: {} | Max: {} | Tab switches: {}",
            summary.average_score,
            summary.average_percentage,
            summary.min_score.map(|s| s.to_string()).unwrap_or_else(|| "—".into()),
            summary.max_score.map(|s| s.to_string()).unwrap_or_else(|| "—".into()),
            summary.total_tab_switches
        );
        worksheet.merge_range(total_row, 6, total_row, last_col, &score_text, &summary_fmt)?;

        worksheet.set_freeze_panes(3, 0)?;
        worksheet.autofilter(2, 0, (data_start_row + attempts.len() as u32).saturating_sub(1).max(2), last_col)?;

        let buffer = workbook.save_to_buffer()?;
        Ok(buffer)
    }

    pub fn results_filename(assessment: &Assessment) -> String {
        let slug: String = assessment
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        let slug = slug.trim_matches('_');
        let slug = if slug.is_empty() { "assessment" } else { slug };
        format!("{}_results_{}.xlsx", slug, chrono::Utc::now().format("%Y%m%d"))
    }
}
