use crate::extract::SiteSelectors;

pub const SELECTORS: SiteSelectors = SiteSelectors {
    title: "#productTitle",
    price: ".a-price-whole",
    description: "#productDescription",
    image: "#landingImage",
    image_attr: "src",
    availability: "#availability",
    spec_row: "#productDetails_techSpec_section_1 tr",
    spec_key: "th",
    spec_value: "td",
};
