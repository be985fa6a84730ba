const SHOP_DOMAIN_SUFFIX: &str = ".myshopify.com";

/// Extracts the `page_info` cursor of the `rel="next"` link from a Shopify `Link` header.
///
/// ```text
/// <https://shop.myshopify.com/admin/api/2024-04/orders.json?limit=250&page_info=abc>; rel="previous",
/// <https://shop.myshopify.com/admin/api/2024-04/orders.json?limit=250&page_info=def>; rel="next"
/// ```
/// yields `Some("def")`.
pub fn next_page_info(link_header: &str) -> Option<String> {
    link_header.split(',').find_map(|link| {
        let mut parts = link.split(';');
        let url = parts.next()?.trim().trim_start_matches('<').trim_end_matches('>');
        let is_next = parts.any(|p| p.trim().replace(' ', "") == "rel=\"next\"");
        if !is_next {
            return None;
        }
        let (_, query) = url.split_once('?')?;
        query
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .find(|(k, _)| *k == "page_info")
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.is_empty())
    })
}

/// `my-shop.myshopify.com` -> `my-shop`. Anything without the suffix is returned unchanged.
pub fn shop_name_from_domain(domain: &str) -> &str {
    let domain = domain.trim();
    domain.strip_suffix(SHOP_DOMAIN_SUFFIX).unwrap_or(domain)
}
