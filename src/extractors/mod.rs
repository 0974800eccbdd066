// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 提取器模块
///
/// 每个来源族一个模块，将原始HTML/JSON解析为归一化的抓取记录：
/// - kijiji：分类广告站搜索页与详情页
/// - shopify：通用店面单品页及目录爬取
/// - priceindex：零售价格指数页（喂MSRP表）
/// - payload：内嵌状态JSON的集合发现与字段别名探测
pub mod kijiji;
pub mod payload;
pub mod priceindex;
pub mod shopify;
