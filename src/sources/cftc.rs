use crate::sources::http;
use crate::types::*;
use reqwest::Client;
use tracing::debug;

/// Traders in Financial Futures report, futures only, long format
pub const DEFAULT_REPORT_URL: &str = "https://www.cftc.gov/dea/futures/financial_lf.htm";

/// Market header of the peso contract (CME code 095741)
pub const MEXICAN_PESO_MARKET: &str = "MEXICAN PESO";
/// Notional of one peso futures contract, in pesos
pub const PESO_CONTRACT_SIZE: f64 = 500_000.0;

/// Lines after the market header searched for the positions row
const MAX_BLOCK_LINES: usize = 20;
/// Open interest followed by four trader groups x (long, short, spreading)
const MIN_POSITION_COLUMNS: usize = 13;
const OPEN_INTEREST_COLUMN: usize = 0;
const LEVERAGED_LONG_COLUMN: usize = 7;
const LEVERAGED_SHORT_COLUMN: usize = 8;

/// Parser for one market block of the TFF text report
///
/// The page layout is an external contract: a header line naming the
/// market, a `Positions` label line, then one row of comma-grouped integers
/// starting with open interest. Anything else is reported as format drift.
#[derive(Debug, Clone)]
pub struct CotReportParser {
    market: String,
    contract_size: f64,
}

impl CotReportParser {
    pub fn new(market: impl Into<String>, contract_size: f64) -> Self {
        Self {
            market: market.into(),
            contract_size,
        }
    }

    pub fn parse(&self, report: &str) -> Result<PositioningReport> {
        let lines: Vec<&str> = report.lines().collect();
        let needle = self.market.to_uppercase();

        let header = lines
            .iter()
            .position(|line| line.to_uppercase().contains(&needle))
            .ok_or_else(|| {
                SignalError::Parse(format!("format drift: market {:?} not found", self.market))
            })?;

        let block_end = (header + 1 + MAX_BLOCK_LINES).min(lines.len());
        let block = &lines[header + 1..block_end];

        let label = block
            .iter()
            .position(|line| is_positions_label(line))
            .ok_or_else(|| {
                SignalError::Parse("format drift: positions row not found".to_string())
            })?;

        let row = block[label + 1..]
            .iter()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| SignalError::Parse("format drift: positions row empty".to_string()))?;

        let columns = parse_columns(row)?;
        if columns.len() < MIN_POSITION_COLUMNS {
            return Err(SignalError::Parse(format!(
                "format drift: expected at least {} position columns, found {}",
                MIN_POSITION_COLUMNS,
                columns.len()
            )));
        }

        let long = columns[LEVERAGED_LONG_COLUMN];
        let short = columns[LEVERAGED_SHORT_COLUMN];
        let net = long - short;

        Ok(PositioningReport {
            market: self.market.clone(),
            open_interest: columns[OPEN_INTEREST_COLUMN],
            long_contracts: long,
            short_contracts: short,
            net_contracts: net,
            net_notional_billions: net as f64 * self.contract_size / 1e9,
        })
    }
}

fn is_positions_label(line: &str) -> bool {
    line.trim_matches(|c: char| c.is_whitespace() || c == ':')
        .eq_ignore_ascii_case("positions")
}

fn parse_columns(row: &str) -> Result<Vec<i64>> {
    row.split(|c: char| c.is_whitespace() || c == ':')
        .filter(|token| !token.is_empty())
        .map(|token| {
            token.replace(',', "").parse::<i64>().map_err(|_| {
                SignalError::Parse(format!("format drift: non-numeric position {:?}", token))
            })
        })
        .collect()
}

/// CFTC Commitments of Traders client
pub struct CftcClient {
    client: Client,
    report_url: String,
    parser: CotReportParser,
}

impl CftcClient {
    pub fn new(client: Client, report_url: impl Into<String>) -> Self {
        Self {
            client,
            report_url: report_url.into(),
            parser: CotReportParser::new(MEXICAN_PESO_MARKET, PESO_CONTRACT_SIZE),
        }
    }

    pub async fn get_positioning(&self) -> Result<PositioningReport> {
        debug!(url = %self.report_url, "Fetching CFTC report");
        let page = http::get_text("cftc", self.client.get(&self.report_url)).await?;
        self.parser.parse(&page)
    }
}

#[async_trait::async_trait]
impl PositioningSource for CftcClient {
    async fn fetch_positioning(&self) -> Result<PositioningReport> {
        CftcClient::get_positioning(self).await
    }

    fn name(&self) -> &str {
        "cftc"
    }
}
