/// Injected before every document the session loads.
///
/// The chat client only inspects the navigator surface, so only that surface
/// is masked: `navigator.webdriver` absent, realistic languages and plugins,
/// a `window.chrome.runtime` stub and no driver globals.
pub(super) fn navigator_mask_script() -> &'static str {
    r#"
(() => {
    try {
        const proto = Navigator.prototype;
        try {
            Object.defineProperty(proto, 'webdriver', { get: () => undefined, configurable: true });
        } catch (e) {}
        try { delete navigator.webdriver; } catch (e) {}
        try {
            Object.defineProperty(proto, 'languages', { get: () => ['en-US', 'en'], configurable: true });
        } catch (e) {}
        try {
            Object.defineProperty(proto, 'plugins', { get: () => [1, 2, 3, 4, 5], configurable: true });
        } catch (e) {}
    } catch (e) {}
})();

if (!window.chrome) {
    window.chrome = {};
}
if (!window.chrome.runtime) {
    window.chrome.runtime = {
        connect: function() { return { onDisconnect: { addListener: function() {} } }; },
        sendMessage: function() {},
    };
}

const originalQuery = window.navigator.permissions && window.navigator.permissions.query;
if (originalQuery) {
    window.navigator.permissions.query = (parameters) => (
        parameters.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : originalQuery(parameters)
    );
}

delete window.__playwright;
delete window.__puppeteer;
delete window.__selenium;
delete window.__webdriver_evaluate;
delete window.__driver_evaluate;
"#
}
