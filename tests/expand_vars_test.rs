//! Tests for shell-style expansion of document paths in settings

use rsconf::domain::expand_env_vars;

#[test]
fn given_path_with_dollar_var_when_expanding_then_substitutes() {
    // Arrange
    std::env::set_var("RSCONF_TEST_ETC", "/etc/app");

    // Act
    let result = expand_env_vars("$RSCONF_TEST_ETC/defaults.xml");

    // Assert
    assert_eq!(result, "/etc/app/defaults.xml");

    std::env::remove_var("RSCONF_TEST_ETC");
}

#[test]
fn given_path_with_braced_var_when_expanding_then_substitutes() {
    std::env::set_var("RSCONF_TEST_PROFILE", "prod");

    let result = expand_env_vars("conf/${RSCONF_TEST_PROFILE}.xml");

    assert_eq!(result, "conf/prod.xml");

    std::env::remove_var("RSCONF_TEST_PROFILE");
}

#[test]
fn given_undefined_var_when_expanding_then_input_unchanged() {
    let result = expand_env_vars("$RSCONF_TEST_UNDEFINED_XYZ/app.xml");

    assert_eq!(result, "$RSCONF_TEST_UNDEFINED_XYZ/app.xml");
}

#[test]
fn given_reference_delimiters_when_expanding_then_left_alone() {
    let result = expand_env_vars("%env.HOME%/app.xml");

    assert_eq!(result, "%env.HOME%/app.xml");
}
