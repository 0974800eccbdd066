// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::collections::HashMap;

/// 按汇率表将价格折算为美元
///
/// 仅用于变化检测，存储始终保留来源货币。未知或为零的
/// 汇率返回None（无法比较时宁可不计为变化）
pub fn to_usd(price: Option<f64>, currency: &str, rates: &HashMap<String, f64>) -> Option<f64> {
    let price = price?;
    let currency = currency.to_uppercase();
    if currency == "USD" {
        return Some(price);
    }
    match rates.get(&currency) {
        Some(rate) if *rate != 0.0 => Some(price * rate),
        _ => None,
    }
}

/// 判断两次抓取之间价格是否发生实质变化
///
/// 比较折算为美元并取整到分的金额：原币种相等比较会漏掉
/// 带汇率噪声的真实变价，也会漏掉货币本身改变的情况
pub fn usd_price_changed(
    old_price: Option<f64>,
    old_currency: &str,
    new_price: Option<f64>,
    new_currency: &str,
    rates: &HashMap<String, f64>,
) -> bool {
    let (Some(old_usd), Some(new_usd)) = (
        to_usd(old_price, old_currency, rates),
        to_usd(new_price, new_currency, rates),
    ) else {
        return false;
    };
    to_cents(old_usd) != to_cents(new_usd)
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}
