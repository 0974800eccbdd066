// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::TestContext;
use dealrs::domain::repositories::config_repository::ConfigRepository;
use dealrs::workers::cycle::update_retail_prices;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_HTML: &str = r#"<html><body>
  <div class="drop">
    <a href="price-details.php?brand=BambuLab&model=P1S">Bambu Lab P1S</a>
    <span>$699.00</span><span>$549.00</span>
  </div>
  <div class="drop">
    <a href="price-details.php?brand=Sovol&model=SV06">Sovol SV06</a>
    <span>$259.00</span><span>$199.00</span>
  </div>
</body></html>"#;

#[tokio::test]
async fn index_scrape_feeds_msrp_table() {
    let ctx = TestContext::new().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/3d-printer-price.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string(INDEX_HTML))
        .mount(&server)
        .await;

    let updated = update_retail_prices(
        ctx.config.as_ref(),
        Some(&format!("{}/3d-printer-price.php", server.uri())),
    )
    .await
    .unwrap();
    assert_eq!(updated, 2);

    let entries = ctx.config.msrp_entries().await.unwrap();
    assert_eq!(entries.len(), 2);

    // Brands are lowercased on upsert; index MSRP and sale price land
    // as msrp_cad and retail_price
    let bambu = entries.iter().find(|e| e.brand == "bambulab").unwrap();
    assert_eq!(bambu.model, "P1S");
    assert_eq!(bambu.msrp_cad, 699.0);
    assert_eq!(bambu.retail_price, Some(549.0));

    // Re-running refreshes rather than duplicating
    let updated = update_retail_prices(
        ctx.config.as_ref(),
        Some(&format!("{}/3d-printer-price.php", server.uri())),
    )
    .await
    .unwrap();
    assert_eq!(updated, 2);
    assert_eq!(ctx.config.msrp_entries().await.unwrap().len(), 2);
}

#[tokio::test]
async fn unreachable_index_is_an_error() {
    let ctx = TestContext::new().await;
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = update_retail_prices(ctx.config.as_ref(), Some(&server.uri())).await;
    assert!(result.is_err());
    assert!(ctx.config.msrp_entries().await.unwrap().is_empty());
}
