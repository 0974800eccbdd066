// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde_json::{json, Value};

/// 轮换使用的浏览器User-Agent池
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

/// 首次启动时种入settings表的默认值
pub fn default_settings() -> Vec<(&'static str, Value)> {
    vec![
        ("max_pages_per_query", json!(5)),
        ("request_delay_min", json!(2.0)),
        ("request_delay_max", json!(5.0)),
        ("inactive_threshold", json!(3)),
        ("scrape_interval_hours", json!(6.0)),
        ("scheduler_enabled", json!(false)),
        ("fx_rates_to_usd", json!({"USD": 1.0, "CAD": 0.74})),
        ("webhook_enabled", json!(false)),
        ("webhook_url", json!("")),
        (
            "webhook_events",
            json!(["scrape_completed", "scrape_failed", "new_deal_detected"]),
        ),
        ("webhook_deal_max_price_to_retail_ratio", json!(0.9)),
        ("webhook_deal_min_drop_pct", json!(15.0)),
        ("webhook_deal_batch_size", json!(5)),
    ]
}

/// 默认搜索查询，多个措辞以覆盖不同的发布习惯
pub fn default_search_queries() -> Vec<(&'static str, &'static str)> {
    vec![
        ("https://www.kijiji.ca/b-canada/3d-printer/k0l0", "3d printer"),
        ("https://www.kijiji.ca/b-canada/3d-printing/k0l0", "3d printing"),
        ("https://www.kijiji.ca/b-canada/bambu-lab/k0l0", "bambu lab"),
        ("https://www.kijiji.ca/b-canada/prusa/k0l0", "prusa"),
        ("https://www.kijiji.ca/b-canada/creality/k0l0", "creality"),
        ("https://www.kijiji.ca/b-canada/ender-3/k0l0", "ender 3"),
        ("https://www.kijiji.ca/b-canada/anycubic/k0l0", "anycubic"),
        ("https://www.kijiji.ca/b-canada/voron/k0l0", "voron"),
    ]
}

/// 默认品牌关键词表（全小写）
pub fn default_brand_keywords() -> Vec<(&'static str, &'static [&'static str])> {
    vec![
        (
            "bambu",
            &["bambu", "bambulab", "bambu lab", "x1c", "x1 carbon", "p1s", "p1p", "a1 mini", "a1mini"][..],
        ),
        ("prusa", &["prusa", "mk4", "mk3s", "mk3", "mini+", "xl"][..]),
        ("creality", &["creality", "cr-10", "cr10", "k1 max", "k1c"][..]),
        ("ender", &["ender", "ender 3", "ender3", "ender 5", "ender5"][..]),
        ("anycubic", &["anycubic", "kobra", "vyper", "mega"][..]),
        ("voron", &["voron", "v0", "v2.4", "trident"][..]),
        ("elegoo", &["elegoo", "neptune"][..]),
        ("flashforge", &["flashforge", "adventurer"][..]),
        ("sovol", &["sovol", "sv06", "sv07"][..]),
        ("qidi", &["qidi"][..]),
    ]
}
