//! compiler.rs - Compilation and caching of masking rule sets.
//!
//! Turning a [`MaskConfig`] into something executable means compiling every
//! anchor and aggregating the rules (see `aggregate`). The result is immutable
//! and shared between all file tasks behind an `Arc`. A process-wide cache
//! keyed by the config fingerprint avoids recompiling the same rules.
//!
//! License: MIT OR APACHE 2.0

use lazy_static::lazy_static;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::aggregate::{build_block_groups, BlockGroup, SingleLineRuleSet};
use crate::config::MaskConfig;
use crate::errors::FilemaskError;

/// The executable form of a [`MaskConfig`]. Read-only once built.
#[derive(Debug)]
pub struct CompiledRuleSet {
    config: MaskConfig,
    fingerprint: String,
    single_line: SingleLineRuleSet,
    block_groups: Vec<BlockGroup>,
}

impl CompiledRuleSet {
    pub fn config(&self) -> &MaskConfig {
        &self.config
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn single_line(&self) -> &SingleLineRuleSet {
        &self.single_line
    }

    /// Block groups in the order their passes run.
    pub fn block_groups(&self) -> &[BlockGroup] {
        &self.block_groups
    }

    pub fn rule_count(&self) -> usize {
        self.config.rules.len()
    }
}

lazy_static! {
    /// Compiled rule sets keyed by config fingerprint.
    static ref COMPILED_RULES_CACHE: RwLock<HashMap<String, Arc<CompiledRuleSet>>> =
        RwLock::new(HashMap::new());
}

/// Compiles a config without consulting the cache.
pub fn compile_rules(config: MaskConfig) -> Result<CompiledRuleSet, FilemaskError> {
    debug!("Starting compilation of {} rules.", config.rules.len());
    let fingerprint = config.fingerprint()?;
    let single_line = SingleLineRuleSet::build(&config)?;
    let block_groups = build_block_groups(&config);
    debug!(
        "Finished compiling rules: {} single-line bucket(s), {} block group(s).",
        single_line.bucket_count(),
        block_groups.len()
    );
    Ok(CompiledRuleSet {
        config,
        fingerprint,
        single_line,
        block_groups,
    })
}

/// Returns the compiled form of `config`, compiling and caching it on first use.
pub fn get_or_compile_rules(config: &MaskConfig) -> Result<Arc<CompiledRuleSet>, FilemaskError> {
    let cache_key = config.fingerprint()?;

    {
        let cache = COMPILED_RULES_CACHE
            .read()
            .map_err(|_| FilemaskError::Fatal("compiled rule cache lock poisoned".to_string()))?;
        if let Some(rules) = cache.get(&cache_key) {
            debug!("Serving compiled rules from cache for key: {}", &cache_key[..12]);
            return Ok(Arc::clone(rules));
        }
    }

    debug!("Compiled rules not found in cache. Compiling now.");
    let compiled = Arc::new(compile_rules(config.clone())?);

    COMPILED_RULES_CACHE
        .write()
        .map_err(|_| FilemaskError::Fatal("compiled rule cache lock poisoned".to_string()))?
        .insert(cache_key, Arc::clone(&compiled));
    Ok(compiled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RuleKind, SingleLineRule};

    #[test]
    fn test_cache_returns_shared_instance() {
        let config = MaskConfig::new(
            vec![RuleKind::SingleLine(SingleLineRule::new("CACHE-TEST%", "1-2"))],
            0,
        );
        let a = get_or_compile_rules(&config).unwrap();
        let b = get_or_compile_rules(&config).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.rule_count(), 1);
        assert_eq!(a.fingerprint().len(), 64);
    }
}
