use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CountframeError::configuration("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        CountframeError::render("x")
            .to_string()
            .contains("render error:")
    );
    assert!(
        CountframeError::encoding("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        CountframeError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CountframeError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
