//! Static HTML rendering of a custody statement.

use custody_ledger::statement::{AssetTotals, StatementReport};
use custody_ledger::AssetId;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

/// Render a static HTML statement to `out_path`. Embeds the statement JSON for verification.
pub fn render_report(
    data: &StatementReport,
    out_path: impl AsRef<Path>,
) -> Result<(), ReportError> {
    let html = build_html(data)?;
    let mut f = std::fs::File::create(out_path.as_ref()).map_err(ReportError::Io)?;
    f.write_all(html.as_bytes()).map_err(ReportError::Io)?;
    Ok(())
}

/// Build HTML string from report data (for testing or in-memory use).
pub fn build_html(data: &StatementReport) -> Result<String, ReportError> {
    let json_embed = serde_json::to_string(&data.statement).map_err(ReportError::Json)?;
    let s = &data.statement;

    let mut totals_rows = String::new();
    for (asset, t) in &s.totals {
        totals_row(&mut totals_rows, asset, t);
    }
    let mut position_rows = String::new();
    for row in &s.rows {
        let _ = writeln!(
            position_rows,
            r#"    <tr><td class="mono">{}</td><td class="mono">{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            escape_html(&asset_label(&row.asset)),
            escape_html(&row.account),
            row.principal,
            row.effective_balance,
            row.last_update_ts,
        );
    }
    let status = if s.is_solvent() {
        r#"<span class="ok">fully covered</span>"#
    } else {
        r#"<span class="bad">shortfall</span>"#
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8"/>
<meta name="viewport" content="width=device-width,initial-scale=1"/>
<title>Custody Statement – {as_of}</title>
<style>
:root {{ font-family: system-ui, sans-serif; background: #0f1419; color: #e6edf3; }}
body {{ max-width: 880px; margin: 0 auto; padding: 1.5rem; }}
h1 {{ font-size: 1.4rem; margin-bottom: 0.5rem; }}
h2 {{ font-size: 1.1rem; margin-top: 1.5rem; color: #8b949e; }}
.mono {{ font-family: ui-monospace, monospace; font-size: 0.9em; word-break: break-all; }}
.card {{ background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 1rem; margin: 0.5rem 0; }}
table {{ width: 100%; border-collapse: collapse; }}
th, td {{ text-align: left; padding: 0.25rem 0.5rem; border-bottom: 1px solid #30363d; }}
th {{ color: #8b949e; font-weight: normal; }}
.ok {{ color: #3fb950; }}
.bad {{ color: #f85149; }}
.footer {{ margin-top: 2rem; font-size: 0.85rem; color: #8b949e; }}
</style>
</head>
<body>
<h1>Custody Statement</h1>
<p>As of {as_of} (unix {as_of_unix}) · status: {status}</p>
<p>Administrator: <span class="mono">{owner}</span> · events recorded: {event_count}</p>

<h2>Reproducibility</h2>
<div class="card">
  <div class="mono">SHA-256: {hash}</div>
  <p class="footer">Re-run <code>custody-ledger verify --statement &lt;file&gt;</code> and compare the hash.</p>
</div>

<h2>Per-asset totals</h2>
<div class="card">
  <table>
    <tr><th>Asset</th><th>Principal</th><th>Liabilities</th><th>Held</th><th>Surplus</th><th>Shortfall</th></tr>
{totals_rows}  </table>
</div>

<h2>Positions</h2>
<div class="card">
  <table>
    <tr><th>Asset</th><th>Account</th><th>Principal</th><th>Effective</th><th>Last update</th></tr>
{position_rows}  </table>
</div>

<h2>Statement (embedded)</h2>
<div class="card">
  <p class="footer">The full statement is embedded below for verification. Do not edit.</p>
  <script type="application/json" id="custody-statement">{json_embed}</script>
</div>
</body>
</html>"#,
        as_of = escape_html(&s.as_of_rfc3339),
        as_of_unix = s.as_of_unix,
        status = status,
        owner = escape_html(&s.owner),
        event_count = s.event_count,
        hash = escape_html(&data.reproducibility_hash_sha256),
        totals_rows = totals_rows,
        position_rows = position_rows,
        json_embed = escape_html(&json_embed),
    );
    Ok(html)
}

fn totals_row(out: &mut String, asset: &AssetId, t: &AssetTotals) {
    let _ = writeln!(
        out,
        r#"    <tr><td class="mono">{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
        escape_html(&asset_label(asset)),
        t.principal,
        t.liabilities,
        t.held,
        t.surplus,
        t.shortfall,
    );
}

fn asset_label(asset: &AssetId) -> String {
    match asset {
        AssetId::Native => "native".to_string(),
        AssetId::Token(addr) => addr.to_string(),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug)]
pub enum ReportError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportError::Io(e) => write!(f, "io: {}", e),
            ReportError::Json(e) => write!(f, "json: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

#[cfg(test)]
mod tests {
    use super::*;
    use custody_ledger::{
        AccountId, CustodyStatement, InMemoryCustody, Ledger, ManualClock, SystemClock,
    };
    use std::sync::Arc;

    #[test]
    fn empty_ledger_renders() {
        let ledger = Ledger::new(
            "0x0wner".to_string(),
            InMemoryCustody::new(),
            Arc::new(SystemClock),
        );
        let data = StatementReport::new(CustodyStatement::build(&ledger).unwrap()).unwrap();
        let html = build_html(&data).unwrap();
        assert!(html.contains("Custody Statement"));
        assert!(html.contains("0x0wner"));
        assert!(html.contains("custody-statement"));
        assert!(html.contains("fully covered"));
    }

    #[test]
    fn shortfall_and_rows_render() {
        let clock = ManualClock::at(0);
        let alice: AccountId = "0xa11ce".into();
        let mut ledger = Ledger::new(
            "0x0wner".to_string(),
            InMemoryCustody::new(),
            Arc::new(clock.clone()),
        );
        ledger.custody_mut().mint(&AssetId::Native, &alice, 100);
        ledger.deposit_native(&alice, 100).unwrap();
        clock.advance(365 * 24 * 3600);
        let data = StatementReport::new(CustodyStatement::build(&ledger).unwrap()).unwrap();
        let html = build_html(&data).unwrap();
        assert!(html.contains("shortfall"));
        assert!(html.contains("<td>105</td>"));
        assert!(html.contains(&data.reproducibility_hash_sha256));
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html("<a href='x'>&</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&lt;/a&gt;");
    }
}
