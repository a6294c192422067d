//! Financial signal heuristics
//!
//! Cheap, deterministic scans of extracted document text. Agents attach the
//! results to their prompts and to their stage output so the model's narrative
//! can be checked against figures pulled straight from the document.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static REVENUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)revenues?\s+[\w\s]*?\$?([\d,.]+)").unwrap());
static PROFIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:net income|profit)[\w\s]*?\$?([\d,.]+)").unwrap());
static DEBT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:debt|liabilities)[\w\s]*?\$?([\d,.]+)").unwrap());
static ASSET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)assets?[\w\s]*?\$?([\d,.]+)").unwrap());
static FIGURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[$€£]\s?\d[\d,]*(?:\.\d+)?|\d[\d,]*(?:\.\d+)?\s?%|\d{1,3}(?:,\d{3})+").unwrap());

const POSITIVE_KEYWORDS: &[&str] = &["growth", "expansion", "profit", "strong", "increase", "positive"];
const NEGATIVE_KEYWORDS: &[&str] = &["loss", "decline", "risk", "decrease", "negative", "litigation"];

const MARKET_RISKS: &[&str] = &["competition", "inflation", "recession", "regulation", "currency", "volatility"];
const OPERATIONAL_RISKS: &[&str] = &["lawsuit", "litigation", "supply chain", "strike", "fraud", "management failure"];
const NEGATIVE_SIGNALS: &[&str] = &["loss", "decline", "uncertain", "risk", "default", "bankruptcy", "crisis"];

const STATEMENT_HEADERS: &[&str] = &[
    "balance sheet",
    "income statement",
    "cash flow",
    "statement of operations",
    "statement of financial position",
    "shareholders' equity",
    "stockholders' equity",
    "comprehensive income",
    "annual report",
    "quarterly report",
];
const FINANCIAL_TERMS: &[&str] = &[
    "revenue",
    "net income",
    "operating income",
    "earnings per share",
    "gross margin",
    "ebitda",
    "total assets",
    "liabilities",
    "fiscal year",
    "dividend",
];

/// Minimum number of monetary or percentage figures for a document to count
/// as financial on figures alone
const MIN_FIGURES: usize = 3;

/// Collapse runs of whitespace to single spaces
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whole-number figures matched by `re`; decimals and malformed values are skipped
fn extract_figures(re: &Regex, text: &str) -> Vec<f64> {
    re.captures_iter(text)
        .filter_map(|caps| {
            // A figure ending a sentence keeps its full stop in the capture
            let digits = caps.get(1)?.as_str().trim_end_matches('.').replace(',', "");
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            digits.parse::<f64>().ok()
        })
        .collect()
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn count_occurrences(haystack: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|k| haystack.matches(k).count()).sum()
}

fn present(haystack: &str, keywords: &[&str]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| haystack.contains(*k))
        .map(|k| k.to_string())
        .collect()
}

/// Keyword sentiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

/// Informational recommendation derived from the figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recommendation {
    Buy,
    Hold,
    Sell,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestmentSignals {
    pub average_revenue: Option<f64>,
    pub average_profit: Option<f64>,
    /// Percent
    pub profit_margin: Option<f64>,
    pub average_debt: Option<f64>,
    pub debt_to_income: Option<f64>,
    pub positive_hits: usize,
    pub negative_hits: usize,
    pub sentiment: Sentiment,
    pub recommendation: Recommendation,
}

impl InvestmentSignals {
    pub fn scan(text: &str) -> Self {
        let processed = normalize(text);
        let revenues = extract_figures(&REVENUE_RE, &processed);
        let profits = extract_figures(&PROFIT_RE, &processed);
        let debts = extract_figures(&DEBT_RE, &processed);

        let avg_revenue = mean(&revenues);
        let avg_profit = mean(&profits);
        let avg_debt = mean(&debts);

        let profit_margin = match (avg_revenue, avg_profit) {
            (Some(r), Some(p)) if r != 0.0 => Some(p * 100.0 / r),
            (Some(_), Some(_)) => Some(0.0),
            _ => None,
        };
        let debt_to_income = match (avg_debt, avg_profit) {
            (Some(d), Some(p)) if p != 0.0 => Some(d / p),
            (Some(_), Some(_)) => Some(f64::INFINITY),
            _ => None,
        };

        let lowered = processed.to_lowercase();
        let positive_hits = count_occurrences(&lowered, POSITIVE_KEYWORDS);
        let negative_hits = count_occurrences(&lowered, NEGATIVE_KEYWORDS);

        let sentiment = match positive_hits.cmp(&negative_hits) {
            std::cmp::Ordering::Greater => Sentiment::Positive,
            std::cmp::Ordering::Less => Sentiment::Negative,
            std::cmp::Ordering::Equal => Sentiment::Neutral,
        };

        let recommendation = match profit_margin {
            Some(margin) if margin > 15.0 && positive_hits > negative_hits => Recommendation::Buy,
            Some(margin) if margin < 5.0 || negative_hits > positive_hits => Recommendation::Sell,
            _ => Recommendation::Hold,
        };

        Self {
            average_revenue: avg_revenue,
            average_profit: avg_profit,
            profit_margin,
            average_debt: avg_debt,
            debt_to_income,
            positive_hits,
            negative_hits,
            sentiment,
            recommendation,
        }
    }

    /// One line per finding, for prompts and reports
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let (Some(revenue), Some(profit), Some(margin)) =
            (self.average_revenue, self.average_profit, self.profit_margin)
        {
            lines.push(format!("Average revenue: ${:.2}", revenue));
            lines.push(format!("Average profit: ${:.2}", profit));
            lines.push(format!("Profit margin: {:.2}%", margin));
        }
        if let (Some(debt), Some(ratio)) = (self.average_debt, self.debt_to_income) {
            lines.push(format!("Average debt: ${:.2}", debt));
            lines.push(format!("Debt-to-income ratio: {:.2}", ratio));
        }
        lines.push(format!("Sentiment: {:?}", self.sentiment));
        lines.push(format!("Recommendation: {}", self.recommendation));
        lines.join("\n")
    }
}

/// Severity of a single risk finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Moderate,
    Healthy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskRating {
    High,
    Medium,
    Low,
}

impl fmt::Display for RiskRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatioFinding {
    pub value: f64,
    pub severity: Severity,
}

impl RatioFinding {
    fn grade(value: f64, high_above: f64, moderate_above: f64) -> Self {
        let severity = if value > high_above {
            Severity::High
        } else if value > moderate_above {
            Severity::Moderate
        } else {
            Severity::Healthy
        };
        Self { value, severity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskSignals {
    pub debt_to_assets: Option<RatioFinding>,
    pub debt_to_income: Option<RatioFinding>,
    pub market_risks: Vec<String>,
    pub operational_risks: Vec<String>,
    pub negative_signals: Vec<String>,
    pub overall_rating: RiskRating,
}

impl RiskSignals {
    pub fn scan(text: &str) -> Self {
        let processed = normalize(text);
        let debts = extract_figures(&DEBT_RE, &processed);
        let assets = extract_figures(&ASSET_RE, &processed);
        let profits = extract_figures(&PROFIT_RE, &processed);

        let debt_to_assets = match (mean(&debts), mean(&assets)) {
            (Some(d), Some(a)) => {
                let ratio = if a != 0.0 { d / a } else { 0.0 };
                Some(RatioFinding::grade(ratio, 0.6, 0.4))
            }
            _ => None,
        };
        let debt_to_income = match (mean(&debts), mean(&profits)) {
            (Some(d), Some(p)) => {
                let ratio = if p != 0.0 { d / p } else { f64::INFINITY };
                Some(RatioFinding::grade(ratio, 4.0, 2.0))
            }
            _ => None,
        };

        let lowered = processed.to_lowercase();
        let market_risks = present(&lowered, MARKET_RISKS);
        let operational_risks = present(&lowered, OPERATIONAL_RISKS);
        let negative_signals = present(&lowered, NEGATIVE_SIGNALS);

        let severities: Vec<Severity> = [&debt_to_assets, &debt_to_income]
            .into_iter()
            .flatten()
            .map(|f| f.severity)
            .collect();
        let mut score = 0;
        if severities.contains(&Severity::High) {
            score += 2;
        }
        // Negative keyword hits count as a moderate finding
        if severities.contains(&Severity::Moderate) || !negative_signals.is_empty() {
            score += 1;
        }

        let overall_rating = match score {
            s if s >= 3 => RiskRating::High,
            2 => RiskRating::Medium,
            _ => RiskRating::Low,
        };

        Self {
            debt_to_assets,
            debt_to_income,
            market_risks,
            operational_risks,
            negative_signals,
            overall_rating,
        }
    }

    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(f) = &self.debt_to_assets {
            lines.push(format!("Debt-to-assets ratio: {:.2} ({:?})", f.value, f.severity));
        }
        if let Some(f) = &self.debt_to_income {
            lines.push(format!("Debt-to-income ratio: {:.2} ({:?})", f.value, f.severity));
        }
        if !self.market_risks.is_empty() {
            lines.push(format!("Market risks: {}", self.market_risks.join(", ")));
        }
        if !self.operational_risks.is_empty() {
            lines.push(format!("Operational risks: {}", self.operational_risks.join(", ")));
        }
        if !self.negative_signals.is_empty() {
            lines.push(format!("Negative signals: {}", self.negative_signals.join(", ")));
        }
        lines.push(format!("Overall risk rating: {}", self.overall_rating));
        lines.join("\n")
    }
}

/// Evidence that a document is a financial report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinancialEvidence {
    pub statement_headers: Vec<String>,
    pub terminology: Vec<String>,
    pub figure_count: usize,
}

impl FinancialEvidence {
    pub fn scan(text: &str) -> Self {
        let lowered = normalize(text).to_lowercase();
        Self {
            statement_headers: present(&lowered, STATEMENT_HEADERS),
            terminology: present(&lowered, FINANCIAL_TERMS),
            figure_count: FIGURE_RE.find_iter(&lowered).count(),
        }
    }

    pub fn is_financial(&self) -> bool {
        !self.statement_headers.is_empty()
            || !self.terminology.is_empty()
            || self.figure_count >= MIN_FIGURES
    }
}
