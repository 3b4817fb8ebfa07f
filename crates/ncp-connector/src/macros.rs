/// Creates a `ConnectorError` with the `Protocol` kind.
///
/// Shorthand for `<ncp_connector::ConnectorError as ncp_connector::ConnectorErrorExt>::protocol(context, reason)`.
#[macro_export]
macro_rules! protocol_err {
    ( $context:expr, $reason:expr $(,)? ) => {{
        <$crate::ConnectorError as $crate::ConnectorErrorExt>::protocol($context, $reason)
    }};
}

/// Creates a `ConnectorError` with the `Network` kind wrapping a source error.
///
/// Shorthand for `<ncp_connector::ConnectorError as ncp_connector::ConnectorErrorExt>::network(context, source)`.
#[macro_export]
macro_rules! network_err {
    ( $context:expr, $source:expr $(,)? ) => {{
        <$crate::ConnectorError as $crate::ConnectorErrorExt>::network($context, $source)
    }};
}
