use super::ui;
use crate::core::analytics::Dashboard;
use crate::core::analyzer::{CancelSignal, StatementAnalyzer, StatementFile};
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::fmt::Write;
use tracing::{info, warn};

const BAR_WIDTH: usize = 30;

type SectionRenderer = fn(&Dashboard) -> Result<String>;

/// Dashboard sections in display order. Each renders on its own, so one
/// failing section does not take the others down with it.
const SECTIONS: &[(&str, SectionRenderer)] = &[
    ("Account Overview", render_overview),
    ("Cash Flow", render_cash_flow),
    ("Balance History", render_balance_history),
    ("Top Merchants by Volume", render_merchant_ranking),
    ("Merchant Insights", render_merchant_cards),
    ("Transactions", render_transactions),
];

/// Uploads `file`, then prints the dashboard (or its JSON form).
pub async fn run(analyzer: &dyn StatementAnalyzer, file: &StatementFile, json: bool) -> Result<()> {
    if let Some(notice) = unaccepted_type_notice(file) {
        eprintln!("{notice}");
    }

    info!("Analyzing {}", file.name);
    let spinner = ui::new_spinner(&format!("Analyzing {}...", file.name));
    let outcome = analyzer.submit_with_cancel(file, ctrl_c()).await;
    spinner.finish_and_clear();

    let record = outcome.with_context(|| format!("Upload failed for {}", file.name))?;
    let dashboard = Dashboard::from_record(&record);

    if json {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    } else {
        println!("{}", render_dashboard(&dashboard));
    }
    Ok(())
}

/// Advisory shown before uploading a file the analyzer may reject.
fn unaccepted_type_notice(file: &StatementFile) -> Option<String> {
    if file.is_accepted_type() {
        return None;
    }
    Some(ui::style_text(
        &format!(
            "{} is not a PDF, XLS, XLSX or CSV file, uploading anyway",
            file.name
        ),
        ui::StyleType::Error,
    ))
}

fn ctrl_c() -> CancelSignal {
    Box::pin(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    })
}

pub fn render_dashboard(dashboard: &Dashboard) -> String {
    render_sections(dashboard, SECTIONS)
}

fn render_sections(dashboard: &Dashboard, sections: &[(&str, SectionRenderer)]) -> String {
    let mut output = String::new();

    for (title, render) in sections {
        let body = match render(dashboard) {
            Ok(body) if body.is_empty() => continue,
            Ok(body) => body,
            Err(e) => {
                warn!(section = %title, error = %e, "Failed to render section");
                ui::style_text(
                    &format!("This section could not be displayed: {e}"),
                    ui::StyleType::Error,
                )
            }
        };

        if !output.is_empty() {
            output.push_str(&format!("\n\n{}\n\n", ui::separator()));
        }
        output.push_str(&ui::style_text(title, ui::StyleType::Title));
        output.push_str("\n\n");
        output.push_str(&body);
    }

    output
}

fn render_overview(dashboard: &Dashboard) -> Result<String> {
    let overview = &dashboard.overview;
    let label = |text: &str| ui::style_text(text, ui::StyleType::Label);
    let mut out = String::new();

    writeln!(
        out,
        "{} {} ({})",
        label("Bank:"),
        overview.bank_name,
        overview.ifsc_code
    )?;
    writeln!(
        out,
        "{} {}    {} {}",
        label("Account:"),
        overview.account_number,
        label("Branch:"),
        overview.branch
    )?;
    writeln!(out, "{} {}", label("Holder:"), overview.account_holder)?;
    writeln!(out, "{} {}", label("Period:"), overview.period)?;
    write!(
        out,
        "{} {:.0}% {}",
        label("Parse quality:"),
        overview.confidence_pct,
        ui::style_text(
            &format!(
                "({} / {} txns verified)",
                overview.high_confidence_txns, overview.total_transactions
            ),
            ui::StyleType::Subtle
        )
    )?;
    Ok(out)
}

fn render_cash_flow(dashboard: &Dashboard) -> Result<String> {
    let flow = &dashboard.cash_flow;
    let net = flow.net();
    let net_style = if net >= 0.0 {
        ui::StyleType::Positive
    } else {
        ui::StyleType::Negative
    };

    let mut out = String::new();
    writeln!(
        out,
        "Income:  {}",
        ui::style_text(&ui::format_inr(flow.income), ui::StyleType::Positive)
    )?;
    writeln!(
        out,
        "Expense: {}",
        ui::style_text(&ui::format_inr(flow.expense), ui::StyleType::Negative)
    )?;
    write!(
        out,
        "Net:     {}",
        ui::style_text(&ui::format_inr(net), net_style)
    )?;
    Ok(out)
}

fn render_balance_history(dashboard: &Dashboard) -> Result<String> {
    let history = &dashboard.balance_history;
    if history.is_empty() {
        return Ok(ui::style_text(
            "Not enough data to generate charts.",
            ui::StyleType::Subtle,
        ));
    }

    let peak = history
        .iter()
        .map(|p| p.balance.abs())
        .fold(0.0_f64, f64::max);

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Balance"),
        ui::header_cell("Trend"),
    ]);
    for point in history {
        let width = if peak > 0.0 {
            ((point.balance.abs() / peak) * BAR_WIDTH as f64).round() as usize
        } else {
            0
        };
        table.add_row(vec![
            Cell::new(&point.date),
            ui::money_cell(point.balance),
            Cell::new("█".repeat(width)),
        ]);
    }
    Ok(table.to_string())
}

fn render_merchant_ranking(dashboard: &Dashboard) -> Result<String> {
    let ranking = &dashboard.merchant_ranking;
    if ranking.is_empty() {
        return Ok(ui::style_text(
            "No merchant data available",
            ui::StyleType::Subtle,
        ));
    }

    let total: f64 = ranking.iter().map(|s| s.value).sum();
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Merchant"),
        ui::header_cell("Volume"),
        ui::header_cell("Share (%)"),
    ]);
    for slice in ranking {
        table.add_row(vec![
            Cell::new(&slice.label),
            ui::money_cell(slice.value),
            Cell::new(format!("{:.1}%", slice.value / total * 100.0))
                .set_alignment(comfy_table::CellAlignment::Right),
        ]);
    }
    Ok(table.to_string())
}

fn render_merchant_cards(dashboard: &Dashboard) -> Result<String> {
    let cards = &dashboard.merchant_cards;
    if cards.is_empty() {
        return Ok(String::new());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Merchant"),
        ui::header_cell("Txns"),
        ui::header_cell("Avg Amount"),
        ui::header_cell("Last Seen"),
    ]);
    for card in cards {
        table.add_row(vec![
            Cell::new(&card.name),
            Cell::new(card.count).set_alignment(comfy_table::CellAlignment::Right),
            ui::money_cell(card.avg_amount),
            Cell::new(&card.last_seen),
        ]);
    }
    Ok(table.to_string())
}

fn render_transactions(dashboard: &Dashboard) -> Result<String> {
    let transactions = &dashboard.transactions;
    let mut out = ui::style_text(
        &format!("{} entries", transactions.len()),
        ui::StyleType::Subtle,
    );
    out.push('\n');

    if transactions.is_empty() {
        out.push_str(&ui::style_text(
            "No transactions found in this period.",
            ui::StyleType::Subtle,
        ));
        return Ok(out);
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Narration"),
        ui::header_cell("Method"),
        ui::header_cell("Amount"),
        ui::header_cell("Balance"),
        ui::header_cell("Type"),
    ]);
    for txn in transactions {
        let mut narration = txn.narration.clone().unwrap_or_default();
        if let Some(receiver) = &txn.receiver {
            narration.push_str(&format!("\nTo: {receiver}"));
        }
        table.add_row(vec![
            Cell::new(&txn.date),
            Cell::new(narration),
            Cell::new(&txn.method),
            ui::amount_cell(txn.amount, txn.direction),
            ui::money_cell(txn.balance),
            ui::direction_cell(txn.direction),
        ]);
    }
    out.push_str(&table.to_string());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyzer::{IngestError, IngestionOutcome};
    use crate::core::model::AnalysisRecord;
    use async_trait::async_trait;
    use serde_json::json;

    struct CannedAnalyzer(IngestionOutcome);

    #[async_trait]
    impl StatementAnalyzer for CannedAnalyzer {
        async fn submit(&self, _file: &StatementFile) -> IngestionOutcome {
            self.0.clone()
        }
    }

    fn sample_record() -> AnalysisRecord {
        AnalysisRecord::from_value(json!({
            "account_info": { "bank_name": "Bank of Rust", "account_holder": "ASHA RAO" },
            "confidence_summary": { "high_confidence_txns": 2, "overall_score": 0.8, "total_transactions": 3 },
            "merchant_insights": {
                "Zomato": { "count": 2, "avg_amount": 300.0, "last_seen": "2024-01-09" }
            },
            "transactions": [
                { "transaction_date": "2024-01-09", "amount": 300.0, "balance": 9400.0,
                  "transaction_type": "DEBIT", "narration": "UPI/ZOMATO", "payment_method": "UPI",
                  "receiver_details": { "name": "Zomato Ltd" } },
                { "transaction_date": "2024-01-01", "amount": 10000.0, "balance": 10000.0,
                  "transaction_type": "CREDIT", "narration": "SALARY" }
            ]
        }))
    }

    fn statement() -> StatementFile {
        StatementFile::new("jan.pdf", "application/pdf", b"%PDF".to_vec())
    }

    #[test]
    fn test_render_dashboard_sections() {
        let output = render_dashboard(&Dashboard::from_record(&sample_record()));

        for title in [
            "Account Overview",
            "Cash Flow",
            "Balance History",
            "Top Merchants by Volume",
            "Merchant Insights",
            "Transactions",
        ] {
            assert!(output.contains(title), "missing section {title}");
        }
        assert!(output.contains("Bank of Rust"));
        assert!(output.contains("80%"));
        assert!(output.contains("₹10,000.00"));
        assert!(output.contains("To: Zomato Ltd"));
        assert!(output.contains("2 entries"));
    }

    #[test]
    fn test_render_empty_record_shows_no_data_notices() {
        let output = render_dashboard(&Dashboard::from_record(&AnalysisRecord::default()));

        assert!(output.contains("Unknown Bank"));
        assert!(output.contains("Not enough data to generate charts."));
        assert!(output.contains("No merchant data available"));
        assert!(output.contains("No transactions found in this period."));
        // merchant cards are hidden entirely when there are none
        assert!(!output.contains("Merchant Insights"));
    }

    #[test]
    fn test_failing_section_does_not_hide_others() {
        fn broken(_: &Dashboard) -> Result<String> {
            anyhow::bail!("chart backend unavailable")
        }
        let sections: &[(&str, SectionRenderer)] = &[
            ("Broken", broken),
            ("Cash Flow", render_cash_flow),
        ];

        let output = render_sections(&Dashboard::from_record(&sample_record()), sections);
        assert!(output.contains("This section could not be displayed: chart backend unavailable"));
        assert!(output.contains("Income:"));
    }

    #[test]
    fn test_unaccepted_type_notice() {
        assert!(unaccepted_type_notice(&statement()).is_none());

        let notes = StatementFile::new("notes.txt", "text/plain", b"hi".to_vec());
        let notice = unaccepted_type_notice(&notes).unwrap();
        assert!(notice.contains("notes.txt is not a PDF, XLS, XLSX or CSV file"));
    }

    #[tokio::test]
    async fn test_run_with_successful_outcome() {
        let analyzer = CannedAnalyzer(Ok(sample_record()));
        assert!(run(&analyzer, &statement(), false).await.is_ok());
        assert!(run(&analyzer, &statement(), true).await.is_ok());
    }

    #[tokio::test]
    async fn test_run_surfaces_ingest_error() {
        let analyzer = CannedAnalyzer(Err(IngestError::Logical {
            message: "Unsupported file format".to_string(),
        }));

        let err = run(&analyzer, &statement(), false).await.unwrap_err();
        assert!(err.to_string().contains("Upload failed for jan.pdf"));
        let ingest = err.downcast_ref::<IngestError>().unwrap();
        assert_eq!(ingest.to_string(), "Unsupported file format");
    }
}
