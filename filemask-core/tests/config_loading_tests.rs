// filemask-core/tests/config_loading_tests.rs
use anyhow::Result;
use filemask_core::{
    headless_mask_string, FilemaskError, MaskConfig, MaskingMode, RuleKind, StrategyKind,
};
use std::io::Write;
use tempfile::Builder;

#[test]
fn test_load_json_rule_file() -> Result<()> {
    let mut file = Builder::new().suffix(".json").tempfile()?;
    write!(
        file,
        r#"{{
            "skipLines": 1,
            "rules": [
                {{"type": "type1", "name": "account", "anchor": "ACC%", "positionsString": "5-8"}},
                {{"type": "type2", "anchorStart": "BEGIN", "anchorEnd": "END",
                  "skipStart": 1, "skipEnd": 0, "positionsString": "1-4"}},
                {{"type": "legacy", "anchor": "X"}}
            ]
        }}"#
    )?;

    let config = MaskConfig::load_from_file(file.path())?;
    assert_eq!(config.skip_lines, 1);
    assert_eq!(config.rules.len(), 2);
    assert_eq!(config.rules[0].label, "account");
    assert!(matches!(config.rules[1].kind, RuleKind::Block(_)));
    assert_eq!(config.rules[1].index, 1);

    let (masked, report) = headless_mask_string(
        &config,
        "ACC 1111 header\nACC 2222\nBEGIN\nkeep\nabcdef\nEND\n",
        MaskingMode::Star,
        StrategyKind::Streaming,
    )?;
    assert_eq!(masked, "ACC 1111 header\nACC ****\nBEGIN\nkeep\n****ef\nEND\n");
    assert_eq!(report.masked_by(0), 4);
    assert_eq!(report.masked_by(1), 4);
    assert_eq!(report.per_rule[0].rule_label, "account");
    Ok(())
}

#[test]
fn test_load_yaml_rule_file() -> Result<()> {
    let mut file = Builder::new().suffix(".yaml").tempfile()?;
    writeln!(file, "rules:")?;
    writeln!(file, "  - type: type1")?;
    writeln!(file, "    anchor: \"%SSN%\"")?;
    writeln!(file, "    positionsString: \"1-3\"")?;
    writeln!(file, "    caseSensitive: true")?;

    let config = MaskConfig::load_from_file(file.path())?;
    assert_eq!(config.rules.len(), 1);
    let RuleKind::SingleLine(rule) = &config.rules[0].kind else {
        panic!("expected a single-line rule");
    };
    assert!(rule.case_sensitive);
    assert_eq!(rule.anchor, "%SSN%");
    Ok(())
}

#[test]
fn test_rule_file_without_usable_rules_is_fatal() -> Result<()> {
    let mut file = Builder::new().suffix(".json").tempfile()?;
    write!(file, r#"{{"rules": [{{"type": "type7"}}]}}"#)?;

    let err = MaskConfig::load_from_file(file.path()).unwrap_err();
    let root = err
        .downcast_ref::<FilemaskError>()
        .expect("error should carry FilemaskError");
    assert!(matches!(root, FilemaskError::EmptyRuleSet(_)));
    Ok(())
}

#[test]
fn test_missing_rule_file_reports_path() {
    let err = MaskConfig::load_from_file("/definitely/not/here/rules.json").unwrap_err();
    assert!(format!("{:#}", err).contains("rules.json"));
}

#[test]
fn test_bad_positions_and_anchors_degrade_quietly() -> Result<()> {
    let config = MaskConfig::from_json_str(
        r#"{"rules":[
            {"type":"type1","anchor":"([","useRawRegex":true,"positionsString":"1-3"},
            {"type":"type1","anchor":"%","positionsString":"abc, 0-2, 4-2, 2"}
        ]}"#,
        "inline",
    )?;
    let (masked, report) =
        headless_mask_string(&config, "([x\nabc", MaskingMode::Star, StrategyKind::Buffered)?;
    assert_eq!(masked, "(*x\na*c");
    assert_eq!(report.total_masked, 2);
    assert_eq!(report.masked_by(0), 0);
    Ok(())
}
