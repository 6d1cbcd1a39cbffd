use crate::extract::SiteSelectors;

pub const SELECTORS: SiteSelectors = SiteSelectors {
    title: "h1.x-item-title__mainTitle",
    price: ".x-price-primary",
    description: "#viTabs_0_is",
    image: ".ux-image-carousel-item.active img",
    image_attr: "src",
    availability: "#qtySubTxt",
    spec_row: ".ux-layout-section-evo__col",
    spec_key: ".ux-labels-values__labels",
    spec_value: ".ux-labels-values__values",
};

#[cfg(test)]
mod tests {
    use pricewatch_core::StockStatus;
    use scraper::Html;

    use super::*;
    use crate::extract::extract_fields;

    const LISTING_PAGE: &str = r#"
<html><body>
  <h1 class="x-item-title__mainTitle"><span class="ux-textspans ux-textspans--BOLD">Samsung Galaxy S21 5G SM-G991U 128GB Phantom Gray Unlocked</span></h1>
  <div class="x-price-primary"><span class="ux-textspans">US $219.99</span></div>
  <div class="ux-image-carousel-item active"><img src="https://i.ebayimg.com/images/g/abc/s-l1600.jpg"></div>
  <div id="qtySubTxt"><span>More than 10 available</span></div>
  <div class="ux-layout-section-evo__col">
    <div class="ux-labels-values__labels"><span>Brand</span></div>
    <div class="ux-labels-values__values"><span>Samsung</span></div>
  </div>
  <div class="ux-layout-section-evo__col">
    <div class="ux-labels-values__labels"><span>Storage Capacity</span></div>
    <div class="ux-labels-values__values"><span>128 GB</span></div>
  </div>
  <div class="ux-layout-section-evo__col">
    <div class="ux-labels-values__labels"><span>Lock Status</span></div>
  </div>
</body></html>
"#;

    #[test]
    fn extracts_listing_page() {
        let fields = extract_fields(&Html::parse_document(LISTING_PAGE), &SELECTORS);

        assert_eq!(
            fields.title,
            "Samsung Galaxy S21 5G SM-G991U 128GB Phantom Gray Unlocked"
        );
        assert!((fields.price - 219.99).abs() < 1e-9);
        assert_eq!(
            fields.image_url,
            "https://i.ebayimg.com/images/g/abc/s-l1600.jpg"
        );
        assert_eq!(fields.stock_status, StockStatus::Unknown);
        assert_eq!(fields.description, "");
        assert_eq!(fields.specifications.len(), 2);
        assert_eq!(
            fields.specifications.get("Brand").map(String::as_str),
            Some("Samsung")
        );
    }
}
