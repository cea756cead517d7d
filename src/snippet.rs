//! Embeddable tracking code handed out at registration.
//!
//! The `<script>` beacon posts the page's user agent and path to
//! `/api/track`; the `<noscript>` pixel catches clients that never run
//! JavaScript.

use url::form_urlencoded;

/// Renders the HTML snippet for one website.
pub fn tracking_code(analytics_url: &str, website_id: &str, api_key: &str) -> String {
    let base = analytics_url.trim_end_matches('/');
    let pixel_query = form_urlencoded::Serializer::new(String::new())
        .append_pair("website_id", website_id)
        .append_pair("api_key", api_key)
        .finish();

    format!(
        r#"<script>
  (function() {{
    var websiteId = {website_id};
    var apiKey = {api_key};
    var analyticsUrl = {base};

    function trackVisit() {{
      var data = {{
        website_id: websiteId,
        api_key: apiKey,
        user_agent: navigator.userAgent,
        ip: '',
        path: window.location.pathname,
        referrer: document.referrer
      }};

      fetch(analyticsUrl + '/api/track', {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json' }},
        body: JSON.stringify(data)
      }}).catch(function(err) {{ console.log('Analytics tracking failed:', err); }});
    }}

    if (document.readyState === 'loading') {{
      document.addEventListener('DOMContentLoaded', trackVisit);
    }} else {{
      trackVisit();
    }}
  }})();
</script>
<noscript><img src="{pixel_src}" width="1" height="1" alt="" style="display:none"></noscript>"#,
        website_id = js_string(website_id),
        api_key = js_string(api_key),
        base = js_string(base),
        pixel_src = html_attr(&format!("{base}/api/pixel?{pixel_query}")),
    )
}

/// JSON string literal that is also safe inside an inline `<script>`.
fn js_string(value: &str) -> String {
    serde_json::Value::from(value)
        .to_string()
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
}

fn html_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
