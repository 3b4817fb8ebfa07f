/// Creates an `AcceptorError` with the `Protocol` kind.
#[macro_export]
macro_rules! protocol_err {
    ( $context:expr, $reason:expr $(,)? ) => {{
        <$crate::AcceptorError as $crate::AcceptorErrorExt>::protocol($context, $reason)
    }};
}

/// Creates an `AcceptorError` with the `Network` kind wrapping a source error.
#[macro_export]
macro_rules! network_err {
    ( $context:expr, $source:expr $(,)? ) => {{
        <$crate::AcceptorError as $crate::AcceptorErrorExt>::network($context, $source)
    }};
}
