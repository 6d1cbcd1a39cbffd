use crate::extract::SiteSelectors;

pub const SELECTORS: SiteSelectors = SiteSelectors {
    title: "h1#main-title",
    price: r#"[itemprop="price"]"#,
    description: r#"[data-testid="product-description-content"]"#,
    image: r#"[data-testid="hero-image-container"] img"#,
    image_attr: "src",
    availability: r#"[data-testid="add-to-cart-section"]"#,
    spec_row: r#"[data-testid="specifications"] .pb2"#,
    spec_key: "h3",
    spec_value: "span",
};
