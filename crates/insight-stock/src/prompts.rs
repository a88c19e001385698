//! Prompt templates for the chart analyst
//!
//! Templates are rendered with MiniJinja. The system prompt carries the
//! analyst role and the instruction set; the per-ticker prompt carries the
//! chart legend and, in structured mode, the output format.

use crate::analysis::ResponseMode;
use crate::chart::ChartSpec;
use crate::error::Result;
use crate::indicators::Indicator;
use minijinja::{Environment, context};

/// Recommendation vocabulary offered to the model
pub const RECOMMENDATIONS: [&str; 5] = ["Strong Buy", "Buy", "Hold", "Sell", "Strong Sell"];

const SYSTEM_TEMPLATE: &str = "\
You are a financial analyst and stock market expert specializing in technical analysis.
Your role is to read stock charts, identify key trends, and give actionable insight based on historical price movement.
Explain financial concepts plainly so readers can make informed decisions.
{% if not structured %}
Provide responses in Markdown format.
{% endif %}

Instructions:
* Analyze stock price charts using technical indicators such as {{ indicators | join(\", \") }}.
* Identify bullish and bearish patterns, support and resistance levels, and trend reversals.
* Provide a justified recommendation: {% for r in recommendations %}\"{{ r }}\"{% if not loop.last %}, {% endif %}{% endfor %}.
* Explain the reasoning behind the recommendation using candlestick formations and volume trends.
* Consider market sentiment and historical price performance.
{% if search_enabled %}
* Use the web_search tool to validate key financial data when necessary.
{% endif %}
";

const TICKER_TEMPLATE: &str = "\
Analyze the stock chart for {{ ticker }} based on technical indicators and provide insights.
{% if first_date %}

The chart covers {{ first_date }} to {{ last_date }} ({{ rows }} trading days). The last close was {{ last_close }}.
{% endif %}

Chart legend:
{% for line in legend %}
- {{ line }}
{% endfor %}
{% if structured %}

Respond with a single JSON object and nothing else, in this form:
{\"action\": \"<one of {{ recommendations | join(\", \") }}>\", \"justification\": \"<detailed reasoning>\"}
{% endif %}
";

/// Compiled prompt templates
pub struct PromptTemplates {
    env: Environment<'static>,
}

impl PromptTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.add_template("system", SYSTEM_TEMPLATE)?;
        env.add_template("ticker", TICKER_TEMPLATE)?;
        Ok(Self { env })
    }

    /// Role description and instruction set for the agent
    pub fn system_prompt(&self, mode: ResponseMode, search_enabled: bool) -> Result<String> {
        let indicators: Vec<&str> = Indicator::ALL.iter().map(Indicator::label).collect();
        let rendered = self.env.get_template("system")?.render(context! {
            structured => mode == ResponseMode::Structured,
            search_enabled,
            indicators,
            recommendations => RECOMMENDATIONS,
        })?;
        Ok(rendered)
    }

    /// Request text sent alongside one ticker's chart
    pub fn ticker_prompt(&self, spec: &ChartSpec, mode: ResponseMode) -> Result<String> {
        let candles = spec.candles();
        let rendered = self.env.get_template("ticker")?.render(context! {
            ticker => spec.ticker(),
            first_date => candles.first().map(|b| b.date.to_string()),
            last_date => candles.last().map(|b| b.date.to_string()),
            rows => candles.len(),
            last_close => candles.last().map(|b| format!("{:.2}", b.close)),
            legend => spec.legend(),
            structured => mode == ResponseMode::Structured,
            recommendations => RECOMMENDATIONS,
        })?;
        Ok(rendered)
    }
}
