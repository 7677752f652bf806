//! Built-in Gmail and Outlook profiles

use std::collections::BTreeMap;

use mailpilot_core_types::LogicalTarget;

use crate::types::{LocatorCandidate, ProviderProfile};

fn css(entries: &[(&str, &str)]) -> Vec<LocatorCandidate> {
    entries
        .iter()
        .map(|(selector, description)| LocatorCandidate::css(*selector, *description))
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub fn gmail() -> ProviderProfile {
    let mut locators = BTreeMap::new();
    locators.insert(
        LogicalTarget::ComposeButton,
        css(&[
            ("div[gh='cm']", "compose button"),
            ("div[role='button'][gh='cm']", "compose button by role"),
            (".T-I.T-I-KE.L3", "compose button classes"),
            ("[data-tooltip='Compose']", "compose tooltip"),
            ("div.T-I.T-I-KE.L3", "compose div classes"),
            (".z0>.L3", "legacy compose container"),
        ]),
    );
    locators.insert(
        LogicalTarget::RecipientField,
        css(&[
            ("input[peoplekit-id*='to']", "peoplekit recipient input"),
            ("input[name='to']", "recipient input"),
            ("textarea[name='to']", "recipient textarea"),
            ("div[data-hovercard-id*='to'] input", "recipient hovercard input"),
            (".wO.nr input", "recipient row input"),
        ]),
    );
    locators.insert(
        LogicalTarget::SubjectField,
        css(&[
            ("input[name='subjectbox']", "subject box"),
            ("input[placeholder*='Subject']", "subject placeholder"),
            (".aoT input", "subject row input"),
        ]),
    );
    locators.insert(
        LogicalTarget::BodyField,
        css(&[
            ("div[role='textbox'][aria-label*='Message Body']", "message body"),
            ("div[role='textbox'][aria-label*='Message body']", "message body, lower case"),
            ("div[contenteditable='true'][role='textbox']", "editable textbox"),
            (".Am.Al.editable", "editor classes"),
        ]),
    );
    locators.insert(
        LogicalTarget::SendButton,
        css(&[
            ("div[role='button'][data-tooltip='Send']", "send button tooltip"),
            ("div[role='button'][aria-label*='Send']", "send button label"),
            (".T-I.J-J5-Ji.aoO.v7.T-I-atl.L3", "send button classes"),
            ("[aria-label*='Send']", "anything labelled send"),
            ("div[data-tooltip='Send']", "send tooltip div"),
        ]),
    );
    locators.insert(
        LogicalTarget::NewComposeIndicatorUrlFragment,
        vec![LocatorCandidate::text("compose=new", "compose window open")],
    );

    ProviderProfile {
        id: "gmail".to_string(),
        display_name: "Gmail".to_string(),
        home_url: "https://mail.google.com".to_string(),
        login_url_markers: strings(&["accounts.google.com", "signin"]),
        login_content_markers: strings(&["to continue to gmail"]),
        authenticated_url_markers: strings(&["mail.google.com"]),
        blocked_content_markers: strings(&["this browser or app may not be secure"]),
        locators,
    }
}

pub fn outlook() -> ProviderProfile {
    let mut locators = BTreeMap::new();
    let mut compose = css(&[
        ("[data-testid='new-mail-button']", "new mail test id"),
        ("button[aria-label*='New mail']", "new mail label"),
        ("button[aria-label*='New message']", "new message label"),
        (".ms-Button--primary", "primary button"),
        ("[data-app-section='ComposeButton']", "compose app section"),
    ]);
    compose.push(LocatorCandidate::xpath(
        "//button[contains(text(), 'New mail')]",
        "new mail button text",
    ));
    compose.push(LocatorCandidate::css(
        ".o365button[title*='mail']",
        "o365 mail button",
    ));
    locators.insert(LogicalTarget::ComposeButton, compose);
    locators.insert(
        LogicalTarget::RecipientField,
        css(&[
            ("input[aria-label*='To']", "recipient label"),
            ("input[placeholder*='To']", "recipient placeholder"),
            ("input[data-testid='to-input']", "recipient test id"),
            (".ms-BasePicker-input", "people picker"),
            ("div[data-testid='to-picker'] input", "recipient picker input"),
        ]),
    );
    locators.insert(
        LogicalTarget::SubjectField,
        css(&[
            ("input[aria-label*='Subject']", "subject label"),
            ("input[placeholder*='Subject']", "subject placeholder"),
            ("input[data-testid='subject-input']", "subject test id"),
            (".ms-TextField-field[aria-label*='Subject']", "subject text field"),
        ]),
    );
    locators.insert(
        LogicalTarget::BodyField,
        css(&[
            ("div[role='textbox'][aria-label*='Message body']", "message body"),
            ("div[role='textbox'][aria-label*='message body']", "message body, lower case"),
            ("div[contenteditable='true'][aria-label*='body']", "editable body"),
            (".ms-Editor-editor", "editor"),
            ("div[data-testid='message-body']", "message body test id"),
        ]),
    );
    locators.insert(
        LogicalTarget::SendButton,
        css(&[
            ("button[data-testid='send-button']", "send test id"),
            ("button[aria-label*='Send']", "send label"),
            ("button[title*='Send']", "send title"),
            (".ms-Button--primary", "primary button"),
        ]),
    );

    ProviderProfile {
        id: "outlook".to_string(),
        display_name: "Outlook".to_string(),
        home_url: "https://outlook.live.com".to_string(),
        login_url_markers: strings(&["login.live.com", "signin"]),
        login_content_markers: strings(&["sign in to your microsoft account"]),
        authenticated_url_markers: strings(&["outlook.live.com"]),
        blocked_content_markers: strings(&["unusual activity"]),
        locators,
    }
}

pub fn all() -> Vec<ProviderProfile> {
    vec![gmail(), outlook()]
}
