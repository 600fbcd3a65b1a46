use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_CASES_URL: &str = "https://api.covid19api.com/summary";
pub const DEFAULT_COUNTRIES_URL: &str = "https://restcountries.eu/rest/v2/all";
pub const DEFAULT_BORDERS_URL: &str =
    "https://raw.githubusercontent.com/Sandeeppushp/Covid19Map/master/data/countriesBorderJson.json";

#[derive(Parser, Debug, Clone)]
#[command(
    name = "covidmap",
    about = "Render COVID-19 case statistics per country as an interactive HTML map",
    version,
    long_about = None
)]
pub struct Args {
    /// Output HTML file (overwritten)
    #[arg(short, long, default_value = "index.html")]
    pub output: PathBuf,

    /// Case statistics endpoint
    #[arg(long, default_value = DEFAULT_CASES_URL)]
    pub cases_url: String,

    /// Country metadata endpoint
    #[arg(long, default_value = DEFAULT_COUNTRIES_URL)]
    pub countries_url: String,

    /// Country boundary GeoJSON endpoint
    #[arg(long, default_value = DEFAULT_BORDERS_URL)]
    pub borders_url: String,

    /// Path to custom country name alias file
    #[arg(short, long)]
    pub aliases: Option<PathBuf>,

    /// Disable country name reconciliation
    #[arg(long)]
    pub no_aliases: bool,

    /// Request timeout in seconds
    #[arg(short, long, default_value_t = 30)]
    pub timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Initialize name_aliases.txt with default aliases
    #[arg(long)]
    pub init: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self::parse_from(["covidmap"])
    }
}
