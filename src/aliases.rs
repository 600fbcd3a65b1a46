use anyhow::{Context, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::records::JoinedRecord;

// Include default aliases at compile time
const DEFAULT_ALIASES: &str = include_str!("../default_name_aliases.txt");

pub const DEFAULT_ALIAS_FILE: &str = "name_aliases.txt";

/// One `from => to` substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameAlias {
    pub from: String,
    pub to: String,
}

/// Mapping from API country names to boundary-dataset names.
///
/// No target may also be a source, so applying the table is idempotent.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: Vec<NameAlias>,
    index: HashMap<String, usize>,
}

impl AliasTable {
    pub fn new(aliases: Vec<NameAlias>) -> Result<Self> {
        let mut index = HashMap::with_capacity(aliases.len());
        for (i, alias) in aliases.iter().enumerate() {
            if index.insert(alias.from.clone(), i).is_some() {
                anyhow::bail!("Duplicate alias source '{}'", alias.from);
            }
        }
        if let Some(chained) = aliases.iter().find(|a| index.contains_key(&a.to)) {
            anyhow::bail!(
                "Alias target '{}' is also an alias source; chained aliases are not allowed",
                chained.to
            );
        }
        Ok(Self { aliases, index })
    }

    /// The embedded default table.
    pub fn builtin() -> Result<Self> {
        Self::new(parse_aliases(DEFAULT_ALIASES, true)?)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    #[cfg(test)]
    fn aliases(&self) -> &[NameAlias] {
        &self.aliases
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.index.get(name).map(|&i| self.aliases[i].to.as_str())
    }
}

/// Parses `source => target` lines. `#` comments and blank lines are skipped.
///
/// With `strict`, a malformed line is an error; otherwise it is logged and skipped.
pub fn parse_aliases(content: &str, strict: bool) -> Result<Vec<NameAlias>> {
    let alias_line = Regex::new(r"^(.+?)\s*=>\s*(.+)$")?;
    let mut aliases = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match alias_line.captures(line) {
            Some(caps) => aliases.push(NameAlias {
                from: caps[1].trim().to_string(),
                to: caps[2].trim().to_string(),
            }),
            None if strict => {
                anyhow::bail!("Invalid alias at line {}: expected 'source => target'", line_num + 1)
            }
            None => {
                warn!(action = "parse", component = "alias_line", line_number = line_num + 1, "Invalid alias line")
            }
        }
    }
    Ok(aliases)
}

pub fn load_aliases(alias_file_path: Option<&Path>) -> Result<AliasTable> {
    load_aliases_from(alias_file_path, Path::new(DEFAULT_ALIAS_FILE))
}

fn load_aliases_from(alias_file_path: Option<&Path>, default_file: &Path) -> Result<AliasTable> {
    let start_time = Instant::now();
    info!(action = "start", component = "alias_loading", "Starting alias table loading");

    let table = if let Some(path) = alias_file_path {
        info!(action = "load", component = "alias_file", file_path = ?path, "Loading aliases from specified file");
        if !path.exists() {
            anyhow::bail!("Alias file not found: {:?}", path);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias file {:?}", path))?;
        AliasTable::new(parse_aliases(&content, true)?)
            .with_context(|| format!("Invalid alias table in {:?}", path))?
    } else {
        let mut aliases = Vec::new();
        if default_file.exists() {
            info!(action = "load", component = "default_alias_file", file_path = ?default_file, "Loading aliases from default file");
            let content = fs::read_to_string(default_file)
                .with_context(|| format!("Failed to read alias file {:?}", default_file))?;
            aliases = parse_aliases(&content, false)?;
        }

        if aliases.is_empty() {
            info!(action = "load", component = "embedded_aliases", "Using embedded default aliases");
            AliasTable::builtin()?
        } else {
            AliasTable::new(aliases)
                .with_context(|| format!("Invalid alias table in {:?}", default_file))?
        }
    };

    info!(
        action = "complete",
        component = "alias_loading",
        alias_count = table.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Alias table ready"
    );
    Ok(table)
}

/// Renames every record whose country exactly matches an alias source.
/// Returns how many records were renamed.
pub fn reconcile(records: &mut [JoinedRecord], table: &AliasTable) -> usize {
    if table.is_empty() {
        info!(action = "skip", component = "reconcile", "No aliases configured; names left as reported");
        return 0;
    }

    let mut renamed = 0;
    for record in records.iter_mut() {
        if let Some(target) = table.lookup(&record.country) {
            debug!(action = "rename", component = "reconcile", from = %record.country, to = target, "Country renamed");
            record.country = target.to_string();
            renamed += 1;
        }
    }
    info!(action = "complete", component = "reconcile", renamed, "Country names reconciled");
    renamed
}

pub fn init_default_aliases() -> Result<()> {
    init_default_aliases_at(Path::new(DEFAULT_ALIAS_FILE))?;
    println!("Created {} with default aliases", DEFAULT_ALIAS_FILE);
    Ok(())
}

fn init_default_aliases_at(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!(
            "{} already exists. Remove it first if you want to reinitialize.",
            path.display()
        );
    }
    fs::write(path, DEFAULT_ALIASES).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}
