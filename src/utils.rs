use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;
use url::Url;

pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = LocalTime::new(format_description!(
        "[hour]:[minute]:[second].[subsecond digits:3]"
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: u64) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn validate_endpoint(flag: &str, value: &str) -> anyhow::Result<()> {
    let url = Url::parse(value)
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL ({}): {}", flag, value, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("{} must be an http or https URL, got '{}'", flag, value);
    }
    Ok(())
}

pub fn validate_args(args: &crate::args::Args) -> anyhow::Result<()> {
    if args.timeout == 0 {
        anyhow::bail!("--timeout must be greater than 0");
    }

    if args.no_aliases && args.aliases.is_some() {
        anyhow::bail!("--aliases cannot be combined with --no-aliases");
    }

    validate_endpoint("--cases-url", &args.cases_url)?;
    validate_endpoint("--countries-url", &args.countries_url)?;
    validate_endpoint("--borders-url", &args.borders_url)?;

    Ok(())
}
