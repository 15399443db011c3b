mod concurrency_test;
mod helpers;
mod issue_test;
mod session_test;
