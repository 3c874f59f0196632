use crate::config::ScraperConfig;
use crate::constants::{EXCLUDED_DETAIL_LABELS, NINETY_NINE_PLATFORM, NINETY_NINE_SOURCE};
use crate::error::{Result, ScraperError};
use crate::parser::{self, settle, FieldError, FieldResult};
use crate::types::{
    ExtractError, ListingFields, ListingLink, Pagination, PropertySource, CORE_COLUMNS,
};
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;

/// CSS selectors for 99.co markup. Overridable from `[scraper.selectors]` when the site changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSelectors {
    pub pagination: String,
    pub pagination_link: String,
    pub next_disabled: String,
    pub results_heading: String,
    pub listing_card: String,
    pub listing_anchor: String,
    pub price: String,
    pub beds_icon: String,
    pub baths_icon: String,
    pub area_icon: String,
    pub address: String,
    pub state_script: String,
    pub nearest_mrt: String,
    pub facility: String,
    pub facility_icon: String,
    pub detail_row: String,
    pub detail_label: String,
    pub detail_value: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            pagination: "ul.SearchPagination-links".into(),
            pagination_link: "a".into(),
            next_disabled: "li.next.disabled".into(),
            results_heading: "h2.name".into(),
            listing_card: "div._2J3pS".into(),
            listing_anchor: r#"a[itemprop="url"]"#.into(),
            price: "div#price p".into(),
            beds_icon: r#"img[alt="Beds"]"#.into(),
            baths_icon: r#"img[alt="Bath"]"#.into(),
            area_icon: r#"img[alt="Floor Area"]"#.into(),
            address: "p.dniCg._3j72o._2rhE-".into(),
            state_script: "script#__REDUX_STORE__".into(),
            nearest_mrt: "p._2sIc2._2rhE-._1c-pJ".into(),
            facility: "div._3atmT".into(),
            facility_icon: "img".into(),
            detail_row: "#propertyDetails table._3NpKo tr._2dry3".into(),
            detail_label: "td.NomDX".into(),
            detail_value: "td.XCAFU".into(),
        }
    }
}

struct Selectors {
    pagination: Selector,
    pagination_link: Selector,
    next_disabled: Selector,
    results_heading: Selector,
    listing_card: Selector,
    listing_anchor: Selector,
    price: Selector,
    beds_icon: Selector,
    baths_icon: Selector,
    area_icon: Selector,
    address: Selector,
    state_script: Selector,
    nearest_mrt: Selector,
    facility: Selector,
    facility_icon: Selector,
    detail_row: Selector,
    detail_label: Selector,
    detail_value: Selector,
}

fn compile(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Config(format!("Invalid selector '{}': {:?}", css, e)))
}

impl Selectors {
    fn compile(s: &SiteSelectors) -> Result<Self> {
        Ok(Self {
            pagination: compile(&s.pagination)?,
            pagination_link: compile(&s.pagination_link)?,
            next_disabled: compile(&s.next_disabled)?,
            results_heading: compile(&s.results_heading)?,
            listing_card: compile(&s.listing_card)?,
            listing_anchor: compile(&s.listing_anchor)?,
            price: compile(&s.price)?,
            beds_icon: compile(&s.beds_icon)?,
            baths_icon: compile(&s.baths_icon)?,
            area_icon: compile(&s.area_icon)?,
            address: compile(&s.address)?,
            state_script: compile(&s.state_script)?,
            nearest_mrt: compile(&s.nearest_mrt)?,
            facility: compile(&s.facility)?,
            facility_icon: compile(&s.facility_icon)?,
            detail_row: compile(&s.detail_row)?,
            detail_label: compile(&s.detail_label)?,
            detail_value: compile(&s.detail_value)?,
        })
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text with every fragment trimmed and concatenated
fn stripped_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<String>()
}

/// 99.co Singapore rentals
pub struct NinetyNineCo {
    base_url: String,
    search_path: String,
    selectors: Selectors,
}

impl NinetyNineCo {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            search_path: config.search_path.clone(),
            selectors: Selectors::compile(&config.selectors)?,
        })
    }

    /// Text of the element right after a labeled icon, e.g. the bed count next to `alt="Beds"`.
    fn icon_value(&self, doc: &Html, icon: &Selector) -> Option<String> {
        let marker = doc.select(icon).next()?;
        marker
            .next_siblings()
            .find_map(ElementRef::wrap)
            .map(text_of)
    }

    fn address(&self, doc: &Html) -> FieldResult<String> {
        let blob = doc
            .select(&self.selectors.address)
            .next()
            .ok_or(FieldError::NotFound("address"))?;
        parser::parse_address(&blob.text().collect::<String>())
            .map(Some)
            .ok_or(FieldError::NotFound("address"))
    }

    fn coordinates(&self, doc: &Html) -> FieldResult<parser::Coordinates> {
        let script = doc
            .select(&self.selectors.state_script)
            .next()
            .ok_or(FieldError::NotFound("application state"))?;
        parser::parse_coordinates(script.text().collect::<String>().trim())
    }

    fn nearest_mrt(&self, doc: &Html) -> FieldResult<parser::NearestMrt> {
        let info = doc
            .select(&self.selectors.nearest_mrt)
            .next()
            .ok_or(FieldError::NotFound("nearest_mrt"))?;
        parser::parse_nearest_mrt(&text_of(info)).map(Some)
    }

    fn facilities(&self, doc: &Html) -> FieldResult<Vec<String>> {
        let mut facilities = Vec::new();
        for facility in doc.select(&self.selectors.facility) {
            let alt = facility
                .select(&self.selectors.facility_icon)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .ok_or_else(|| FieldError::Malformed {
                    field: "facilities",
                    message: "facility without a labeled icon".into(),
                })?;
            facilities.push(alt.to_string());
        }
        Ok(Some(facilities))
    }

    fn details(&self, doc: &Html, fields: &mut ListingFields) {
        for row in doc.select(&self.selectors.detail_row) {
            let labels = row.select(&self.selectors.detail_label);
            let values = row.select(&self.selectors.detail_value);
            for (label, value) in labels.zip(values) {
                let label = stripped_text(label);
                if EXCLUDED_DETAIL_LABELS.contains(&label.as_str()) {
                    continue;
                }
                let key = parser::to_snake_case(&label);
                if key.is_empty() || CORE_COLUMNS.contains(&key.as_str()) {
                    debug!(label = %label, "Ignoring detail label that maps onto a core column");
                    continue;
                }
                fields.set_detail(key, stripped_text(value));
            }
        }
    }
}

impl PropertySource for NinetyNineCo {
    fn source_name(&self) -> &'static str {
        NINETY_NINE_SOURCE
    }

    fn platform_name(&self) -> &'static str {
        NINETY_NINE_PLATFORM
    }

    fn page_url(&self, query: &str, page: u32) -> String {
        if page <= 1 {
            format!("{}{}{}", self.base_url, self.search_path, query)
        } else {
            format!(
                "{}{}/?page_num={}&{}",
                self.base_url,
                self.search_path,
                page,
                query.trim_start_matches('?')
            )
        }
    }

    fn listing_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.base_url, href)
        }
    }

    fn paginate(&self, doc: &Html) -> Result<Pagination> {
        let s = &self.selectors;

        if let Some(pagination) = doc.select(&s.pagination).next() {
            let links: Vec<ElementRef> = pagination.select(&s.pagination_link).collect();
            // Only one page: the label after the disabled "previous" arrow.
            // Otherwise the label right before the "next" arrow.
            let label = if pagination.select(&s.next_disabled).next().is_some() {
                links.get(1)
            } else {
                links.len().checked_sub(2).and_then(|i| links.get(i))
            };
            let label = label
                .map(|a| text_of(*a))
                .ok_or_else(|| ScraperError::Markup("pagination has too few links".into()))?;
            return label
                .parse::<u32>()
                .map(Pagination::Pages)
                .map_err(|_| {
                    ScraperError::Markup(format!("page label {:?} is not a number", label))
                });
        }

        let heading = doc
            .select(&s.results_heading)
            .next()
            .map(text_of)
            .ok_or_else(|| {
                ScraperError::Markup("neither pagination nor results heading found".into())
            })?;
        match heading.split_whitespace().nth(2) {
            Some("0") => Ok(Pagination::NoResults),
            Some(_) => Ok(Pagination::Pages(1)),
            None => Err(ScraperError::Markup(format!(
                "unreadable results heading {:?}",
                heading
            ))),
        }
    }

    fn scrape_links(&self, doc: &Html) -> Vec<ListingLink> {
        let s = &self.selectors;
        let mut links = Vec::new();
        for card in doc.select(&s.listing_card) {
            let Some(anchor) = card.select(&s.listing_anchor).next() else {
                debug!("Listing card without a listing anchor");
                continue;
            };
            let attrs = anchor.value();
            let (Some(title), Some(href)) = (attrs.attr("title"), attrs.attr("href")) else {
                debug!("Listing anchor without title or href");
                continue;
            };
            links.push(ListingLink {
                name: title.trim().to_string(),
                href: href.to_string(),
            });
        }
        links
    }

    fn extract_listing(&self, doc: &Html) -> std::result::Result<ListingFields, ExtractError> {
        let s = &self.selectors;

        let price = doc
            .select(&s.price)
            .next()
            .map(text_of)
            .filter(|p| !p.is_empty())
            .ok_or(ExtractError::MissingPrice)?;

        let mut fields = ListingFields {
            price,
            bedroom: self.icon_value(doc, &s.beds_icon),
            bathroom: self.icon_value(doc, &s.baths_icon),
            dimensions: self.icon_value(doc, &s.area_icon),
            address: settle("address", self.address(doc)),
            facilities: settle("facilities", self.facilities(doc)),
            ..Default::default()
        };

        if let Some(coords) = settle("coordinates", self.coordinates(doc)) {
            fields.latitude = Some(coords.lat);
            fields.longitude = Some(coords.lng);
        }

        if let Some(mrt) = settle("nearest_mrt", self.nearest_mrt(doc)) {
            fields.nearest_mrt = Some(mrt.station);
            fields.distance_to_nearest_mrt = mrt.distance_m;
        }

        self.details(doc, &mut fields);

        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> NinetyNineCo {
        NinetyNineCo::new(&ScraperConfig::default()).unwrap()
    }

    #[test]
    fn test_page_urls() {
        let s = source();
        let query = "?query_ids=dtdistrict01&query_type=district&rental_type=all";
        assert_eq!(
            s.page_url(query, 1),
            "https://www.99.co/singapore/rent?query_ids=dtdistrict01&query_type=district&rental_type=all"
        );
        assert_eq!(
            s.page_url(query, 3),
            "https://www.99.co/singapore/rent/?page_num=3&query_ids=dtdistrict01&query_type=district&rental_type=all"
        );
    }

    #[test]
    fn test_listing_url() {
        let s = source();
        assert_eq!(
            s.listing_url("/singapore/rent/property/x-1"),
            "https://www.99.co/singapore/rent/property/x-1"
        );
        assert_eq!(
            s.listing_url("https://other.example/x-1"),
            "https://other.example/x-1"
        );
    }

    #[test]
    fn test_invalid_selector_is_config_error() {
        let mut config = ScraperConfig::default();
        config.selectors.price = "div[[".into();
        assert!(matches!(NinetyNineCo::new(&config), Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_icon_value_reads_next_element() {
        let doc = Html::parse_document(
            r#"<div><img alt="Beds"/> <span>3</span><img alt="Bath"/><span>2</span></div>"#,
        );
        let s = source();
        assert_eq!(s.icon_value(&doc, &s.selectors.beds_icon).as_deref(), Some("3"));
        assert_eq!(s.icon_value(&doc, &s.selectors.baths_icon).as_deref(), Some("2"));
        assert_eq!(s.icon_value(&doc, &s.selectors.area_icon), None);
    }
}
