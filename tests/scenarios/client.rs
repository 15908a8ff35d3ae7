//! Authentication client against local and remote account services

use openria::client::{
    AsyncResult, AuthenticationClient, AuthenticationService, CancellationToken, InlineExecutor, LoginParameters,
    LoginResult, OperationError, OperationState, RuntimeExecutor,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq)]
struct Account {
    name: String,
    theme: String,
}

impl Account {
    fn guest() -> Self {
        Self {
            name: String::new(),
            theme: "light".into(),
        }
    }
}

/// Password table answering synchronously, or after a short sleep when remote.
struct Directory {
    passwords: HashMap<String, String>,
    saved: Mutex<Vec<Account>>,
    remote: bool,
}

impl Directory {
    fn new(remote: bool) -> Self {
        let mut passwords = HashMap::new();
        passwords.insert("ann".to_string(), "secret".to_string());
        Self {
            passwords,
            saved: Mutex::new(Vec::new()),
            remote,
        }
    }

    fn answer<T: Send + 'static>(&self, value: Result<T, OperationError>) -> AsyncResult<T> {
        if !self.remote {
            return AsyncResult::Ready(value);
        }
        AsyncResult::pending(async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            value
        })
    }
}

impl AuthenticationService<Account> for Directory {
    fn login(&self, parameters: LoginParameters, _cancel: CancellationToken) -> AsyncResult<LoginResult<Account>> {
        let ok = self.passwords.get(&parameters.user_name) == Some(&parameters.password);
        let result = if ok {
            LoginResult::success(Account {
                name: parameters.user_name,
                theme: "dark".into(),
            })
        } else {
            LoginResult::rejected()
        };
        self.answer(Ok(result))
    }

    fn logout(&self, _cancel: CancellationToken) -> AsyncResult<Account> {
        self.answer(Ok(Account::guest()))
    }

    fn load_user(&self, _cancel: CancellationToken) -> AsyncResult<Account> {
        self.answer(Ok(Account::guest()))
    }

    fn save_user(&self, user: Account, _cancel: CancellationToken) -> AsyncResult<()> {
        self.saved.lock().push(user);
        self.answer(Ok(()))
    }

    fn anonymous_user(&self) -> Account {
        Account::guest()
    }
}

#[test]
fn local_session_round_trip() {
    let directory = Arc::new(Directory::new(false));
    let client: AuthenticationClient<Account> = AuthenticationClient::new(directory.clone(), Arc::new(InlineExecutor));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.subscribe(move |p| sink.lock().push(p.to_string()));

    let rejected = client.login(LoginParameters::new("ann", "wrong")).unwrap();
    assert_eq!(rejected.state(), OperationState::Succeeded);
    assert!(!rejected.login_success());
    assert_eq!(client.user(), Account::guest());

    let login = client.login(LoginParameters::new("ann", "secret").persistent()).unwrap();
    assert!(login.login_success());
    assert_eq!(client.user().theme, "dark");
    assert!(seen.lock().iter().any(|p| p == "User"));

    client.save_user().unwrap();
    assert_eq!(directory.saved.lock()[0].name, "ann");

    client.logout().unwrap();
    assert_eq!(client.user(), Account::guest());
    assert!(!client.is_busy());
}

#[tokio::test]
async fn remote_login_completes_on_runtime() {
    let executor = Arc::new(RuntimeExecutor::current().unwrap());
    let client: AuthenticationClient<Account> = AuthenticationClient::new(Arc::new(Directory::new(true)), executor);

    let login = client.login(LoginParameters::new("ann", "secret")).unwrap();
    assert!(client.is_logging_in());
    let state = tokio::time::timeout(Duration::from_secs(1), login.completion()).await.unwrap();
    assert_eq!(state, OperationState::Succeeded);

    // Client state is updated by a job posted after completion.
    for _ in 0..50 {
        if !client.is_busy() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    assert_eq!(client.user().name, "ann");
}
