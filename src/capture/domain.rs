use url::{Host, Url};

/// Reduce a URL to its registrable domain (`<name>.<suffix>`) under the public suffix list.
///
/// IP hosts and hosts with no registrable part (`localhost`, a bare suffix) come back
/// unchanged; URLs without a host (data:, blob:, garbage) yield "".
pub fn registrable_domain(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return String::new();
    };

    match parsed.host() {
        Some(Host::Domain(host)) => reduce_host(host),
        Some(Host::Ipv4(ip)) => ip.to_string(),
        Some(Host::Ipv6(ip)) => ip.to_string(),
        None => String::new(),
    }
}

fn reduce_host(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    match psl::domain_str(&host) {
        Some(domain) => domain.to_string(),
        None => host,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registrable_domain() {
        assert_eq!(
            registrable_domain("https://bsc-dataseed1.binance.org/"),
            "binance.org"
        );
        assert_eq!(registrable_domain("https://example.com/path?q=1"), "example.com");
        assert_eq!(registrable_domain("https://WWW.Shop.Example.COM."), "example.com");
        assert_eq!(
            registrable_domain("https://iop.med.br/wp-content/x.js"),
            "iop.med.br"
        );
        assert_eq!(registrable_domain("https://a.b.shop.co.uk/"), "shop.co.uk");
    }

    #[test]
    fn test_registrable_domain_follows_full_suffix_list() {
        assert_eq!(registrable_domain("https://shop.com.es/"), "shop.com.es");
        assert_eq!(registrable_domain("https://login.wallet.gob.mx/"), "wallet.gob.mx");
        assert_eq!(registrable_domain("https://com.es/"), "com.es");
    }

    #[test]
    fn test_registrable_domain_without_domain_host() {
        assert_eq!(registrable_domain("http://127.0.0.1:8545/"), "127.0.0.1");
        assert_eq!(registrable_domain("http://[::1]/"), "::1");
        assert_eq!(registrable_domain("data:text/plain,hello"), "");
        assert_eq!(registrable_domain("not a url"), "");
        assert_eq!(registrable_domain("http://localhost:3000/"), "localhost");
    }
}
