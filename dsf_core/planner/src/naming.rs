/// Separator between a namespace prefix and a node alias.
pub const NAMESPACE_SEPARATOR: &str = "__";

/// Remote name for a node: `prefix__alias`, or the alias when there is no prefix.
pub fn resolve_name(node_alias: &str, namespace_prefix: Option<&str>) -> String {
    match namespace_prefix {
        Some(prefix) if !prefix.is_empty() => {
            format!("{prefix}{NAMESPACE_SEPARATOR}{node_alias}")
        }
        _ => node_alias.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_optional() {
        assert_eq!(resolve_name("orders", None), "orders");
        assert_eq!(resolve_name("orders", Some("")), "orders");
        assert_eq!(resolve_name("orders", Some("dev")), "dev__orders");
    }
}
