//! Deserialization of the JSON test-vector suites under `test-vectors/`.

pub(crate) mod vectors {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub(crate) struct TestFile {
        #[allow(dead_code)]
        pub(crate) name: String,
        pub(crate) tests: Vec<PasetoTest>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct PasetoTest {
        pub(crate) name: String,
        #[serde(rename(deserialize = "expect-fail"))]
        pub(crate) expect_fail: bool,
        pub(crate) key: Option<String>,
        pub(crate) nonce: Option<String>,
        #[serde(rename(deserialize = "public-key"))]
        pub(crate) public_key: Option<String>,
        #[serde(rename(deserialize = "secret-key"))]
        pub(crate) secret_key: Option<String>,
        #[allow(dead_code)]
        #[serde(rename(deserialize = "secret-key-seed"))]
        pub(crate) secret_key_seed: Option<String>,
        pub(crate) token: String,
        pub(crate) payload: Option<String>,
        pub(crate) footer: String,
        #[serde(rename(deserialize = "implicit-assertion"))]
        pub(crate) implicit_assertion: String,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct PaserkTestFile {
        #[allow(dead_code)]
        pub(crate) name: String,
        pub(crate) tests: Vec<PaserkTest>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct PaserkTest {
        pub(crate) name: String,
        #[serde(rename(deserialize = "expect-fail"))]
        pub(crate) expect_fail: bool,
        pub(crate) key: Option<String>,
        pub(crate) paserk: Option<String>,
        #[allow(dead_code)]
        pub(crate) comment: Option<String>,
    }
}
