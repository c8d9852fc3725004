// src/structure/rules.rs
//! Heading marker table. Evaluated top to bottom; the first matching rule
//! decides the level, so overlapping shapes resolve by position here.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug)]
pub struct HeadingRule {
    pub name: &'static str,
    pub pattern: Regex,
    pub level: u8,
}

impl HeadingRule {
    fn new(name: &'static str, pattern: &str, level: u8) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            level,
        }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.pattern.is_match(line)
    }
}

const CJK_NUM: &str = "一二三四五六七八九十百千零〇两";

pub static HEADING_RULES: Lazy<Vec<HeadingRule>> = Lazy::new(|| {
    vec![
        // 第一章 / 第2部 / 第三篇
        HeadingRule::new(
            "cjk_chapter",
            &format!(r"^第[{CJK_NUM}0-9]+[章部篇卷]"),
            1,
        ),
        // Chapter 3 / PART II
        HeadingRule::new(
            "chapter",
            r"(?i)^(?:chapter|part)\s+(?:[0-9]+|[ivxlc]+)\b",
            1,
        ),
        // 第一节
        HeadingRule::new("cjk_section", &format!(r"^第[{CJK_NUM}0-9]+节"), 2),
        // 1.2 Background / 2.3.1Methods
        HeadingRule::new(
            "numeral_dot_multi",
            r"^\d{1,3}(?:\.\d{1,3})+\.?\s*[^\s\d.,]",
            2,
        ),
        // 一、引言
        HeadingRule::new("cjk_ordinal", &format!(r"^[{CJK_NUM}]+[、．.]"), 2),
        // IV. Results
        HeadingRule::new("roman_section", r"^[IVX]{1,4}\.\s+\S", 2),
        // 1. Introduction / 2) Setup / 3、方法
        HeadingRule::new("numbered_item", r"^\d{1,3}[.)、．]\s*[^\s\d]", 3),
        // (1) / （一）
        HeadingRule::new(
            "paren_ordinal",
            &format!(r"^[(（](?:\d{{1,3}}|[{CJK_NUM}]+)[)）]"),
            3,
        ),
        // A. Overview / b) details
        HeadingRule::new("lettered_item", r"^[A-Za-z][.)]\s+\S", 3),
        // Section keywords
        HeadingRule::new(
            "keyword",
            r"(?i)^(?:abstract|introduction|conclusions?|references|figure|table)\b",
            2,
        ),
    ]
});

/// First matching rule for `line`, if any.
pub fn match_rule(line: &str) -> Option<&'static HeadingRule> {
    HEADING_RULES.iter().find(|r| r.matches(line))
}
