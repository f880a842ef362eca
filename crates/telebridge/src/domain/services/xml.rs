//! XML helpers for carrier call-control documents (TeXML / TwiML).

/// Escape `&`, `<`, `>`, `"` and `'` for use in text or attribute values.
pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `<Response><Connect><Stream>` document opening a bidirectional media stream.
///
/// `stream_attributes` are extra carrier-specific attributes on `<Stream>`.
pub fn connect_stream_document(
    stream_url: &str,
    stream_attributes: &[(&str, &str)],
    parameters: &[(&str, &str)],
) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response>\n  <Connect>\n");
    doc.push_str(&format!("    <Stream url=\"{}\"", escape_xml(stream_url)));
    for (name, value) in stream_attributes {
        doc.push_str(&format!(" {}=\"{}\"", name, escape_xml(value)));
    }
    doc.push_str(">\n");
    for (name, value) in parameters {
        doc.push_str(&format!(
            "      <Parameter name=\"{}\" value=\"{}\"/>\n",
            escape_xml(name),
            escape_xml(value)
        ));
    }
    doc.push_str("    </Stream>\n  </Connect>\n</Response>\n");
    doc
}

/// `<Response><Dial><Sip>` document used to move a live call to a SIP target.
pub fn dial_sip_document(sip_uri: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<Response><Dial><Sip>{}</Sip></Dial></Response>",
        escape_xml(sip_uri)
    )
}
