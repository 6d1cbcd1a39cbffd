use crate::extract::SiteSelectors;

pub const SELECTORS: SiteSelectors = SiteSelectors {
    title: r#"[data-pl="product-title"]"#,
    price: ".product-price-current",
    description: "#product-description",
    image: ".magnifier--image--EYYoSlr",
    image_attr: "src",
    availability: ".quantity--info--jnoo_pD",
    spec_row: ".specification--prop--Jh28bKu",
    spec_key: ".specification--title--SfH3sA8",
    spec_value: ".specification--desc--Dxx6W0W",
};

#[cfg(test)]
mod tests {
    use pricewatch_core::StockStatus;
    use scraper::Html;

    use super::*;
    use crate::extract::extract_fields;

    const ITEM_PAGE: &str = r#"
<html><body>
  <h1 data-pl="product-title">Global Version Samsung Galaxy S21 5G 8GB 128GB</h1>
  <div class="product-price-current"><span>US $</span><span>312</span><span>.</span><span>45</span></div>
  <img class="magnifier--image--EYYoSlr" src="https://ae01.alicdn.com/kf/S21.jpg">
  <div class="quantity--info--jnoo_pD"><span>Sold out</span></div>
  <ul>
    <li class="specification--prop--Jh28bKu">
      <div class="specification--title--SfH3sA8"><span>Brand Name</span></div>
      <div class="specification--desc--Dxx6W0W"><span>SAMSUNG</span></div>
    </li>
  </ul>
</body></html>
"#;

    #[test]
    fn extracts_item_page() {
        let fields = extract_fields(&Html::parse_document(ITEM_PAGE), &SELECTORS);

        assert_eq!(fields.title, "Global Version Samsung Galaxy S21 5G 8GB 128GB");
        assert!((fields.price - 312.45).abs() < 1e-9);
        assert_eq!(fields.image_url, "https://ae01.alicdn.com/kf/S21.jpg");
        assert_eq!(fields.stock_status, StockStatus::OutOfStock);
        assert_eq!(
            fields.specifications.get("Brand Name").map(String::as_str),
            Some("SAMSUNG")
        );
    }
}
