/// test.test: a protected ping used by the dashboard to check its session.
pub fn test() -> &'static str {
    "hello world!"
}
