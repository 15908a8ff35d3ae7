//! Authentication operations
//!
//! Four operations cover the user session: [`LoginOperation`],
//! [`LogoutOperation`], [`LoadUserOperation`] and [`SaveUserOperation`].
//! Each is an [`Operation`] with typed accessors for its result.
//! [`AuthenticationClient`] starts them against an [`AuthenticationService`]
//! and keeps track of the current user.

use crate::cancellation::CancellationToken;
use crate::executor::ContinuationExecutor;
use crate::notify::PropertyNotifier;
use crate::operation::{AsyncResult, Operation, OperationState};
use parking_lot::Mutex;
use ria_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tracing::debug;

/// `User` property name
pub const USER: &str = "User";
/// `LoginSuccess` property name
pub const LOGIN_SUCCESS: &str = "LoginSuccess";
/// `IsBusy` property name
pub const IS_BUSY: &str = "IsBusy";
/// `IsLoggingIn` property name
pub const IS_LOGGING_IN: &str = "IsLoggingIn";
/// `IsLoggingOut` property name
pub const IS_LOGGING_OUT: &str = "IsLoggingOut";
/// `IsLoadingUser` property name
pub const IS_LOADING_USER: &str = "IsLoadingUser";
/// `IsSavingUser` property name
pub const IS_SAVING_USER: &str = "IsSavingUser";

/// Credentials of a login
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginParameters {
    /// User name
    pub user_name: String,
    /// Password
    pub password: String,
    /// Keep the session across restarts
    pub is_persistent: bool,
    /// Extra data for custom authentication
    pub custom_data: Option<String>,
}

impl LoginParameters {
    /// Credentials for `user_name`
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Keep the session across restarts
    pub fn persistent(mut self) -> Self {
        self.is_persistent = true;
        self
    }
}

/// Answer to a login
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResult<U> {
    /// The logged-in user, when credentials were accepted
    pub user: Option<U>,
    /// Whether credentials were accepted
    pub login_success: bool,
}

impl<U> LoginResult<U> {
    /// Accepted login
    pub fn success(user: U) -> Self {
        Self {
            user: Some(user),
            login_success: true,
        }
    }

    /// Rejected credentials
    pub fn rejected() -> Self {
        Self {
            user: None,
            login_success: false,
        }
    }
}

/// Server side of authentication, as seen by the client
pub trait AuthenticationService<U>: Send + Sync + 'static {
    /// Check credentials
    fn login(&self, parameters: LoginParameters, cancel: CancellationToken) -> AsyncResult<LoginResult<U>>;

    /// End the session; answers the anonymous user
    fn logout(&self, cancel: CancellationToken) -> AsyncResult<U>;

    /// Load the user of the current session
    fn load_user(&self, cancel: CancellationToken) -> AsyncResult<U>;

    /// Store changes to `user`
    fn save_user(&self, user: U, cancel: CancellationToken) -> AsyncResult<()>;

    /// User before anyone logs in
    fn anonymous_user(&self) -> U;
}

/// Login in progress or completed
#[derive(Debug, Clone)]
pub struct LoginOperation<U> {
    operation: Operation<LoginResult<U>>,
    parameters: LoginParameters,
}

impl<U: Clone + Send + 'static> LoginOperation<U> {
    /// Login with `parameters` through `service`
    pub fn new<S>(service: Arc<S>, parameters: LoginParameters, executor: Arc<dyn ContinuationExecutor>) -> Self
    where
        S: AuthenticationService<U> + ?Sized,
    {
        let sent = parameters.clone();
        let operation = Operation::with_properties(
            "Login",
            move |cancel| service.login(sent, cancel),
            executor,
            &[LOGIN_SUCCESS, USER],
        );
        Self { operation, parameters }
    }

    /// Whether credentials were accepted; `false` until completed
    pub fn login_success(&self) -> bool {
        self.operation
            .with_result(|r| r.map(|r| r.login_success).unwrap_or(false))
    }

    /// User returned by a successful login
    pub fn user(&self) -> Option<U> {
        self.operation.with_result(|r| r.and_then(|r| r.user.clone()))
    }

    /// Credentials sent
    pub fn parameters(&self) -> &LoginParameters {
        &self.parameters
    }
}

impl<U> Deref for LoginOperation<U> {
    type Target = Operation<LoginResult<U>>;

    fn deref(&self) -> &Self::Target {
        &self.operation
    }
}

macro_rules! user_operation {
    ($(#[$doc:meta])* $name:ident, $label:literal, $result:ty) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name<U> {
            operation: Operation<$result>,
        }

        impl<U> Deref for $name<U> {
            type Target = Operation<$result>;

            fn deref(&self) -> &Self::Target {
                &self.operation
            }
        }

        impl<U: Clone + Send + 'static> $name<U> {
            fn from_producer(
                producer: impl FnOnce(CancellationToken) -> AsyncResult<$result> + Send + 'static,
                executor: Arc<dyn ContinuationExecutor>,
            ) -> Self {
                Self {
                    operation: Operation::with_properties($label, producer, executor, &[USER]),
                }
            }
        }
    };
}

user_operation!(
    /// Logout in progress or completed
    LogoutOperation,
    "Logout",
    U
);
user_operation!(
    /// User load in progress or completed
    LoadUserOperation,
    "LoadUser",
    U
);

impl<U: Clone + Send + 'static> LogoutOperation<U> {
    /// Logout through `service`
    pub fn new<S>(service: Arc<S>, executor: Arc<dyn ContinuationExecutor>) -> Self
    where
        S: AuthenticationService<U> + ?Sized,
    {
        Self::from_producer(move |cancel| service.logout(cancel), executor)
    }

    /// Anonymous user returned by the logout
    pub fn user(&self) -> Option<U> {
        self.operation.result()
    }
}

impl<U: Clone + Send + 'static> LoadUserOperation<U> {
    /// Load the session user through `service`
    pub fn new<S>(service: Arc<S>, executor: Arc<dyn ContinuationExecutor>) -> Self
    where
        S: AuthenticationService<U> + ?Sized,
    {
        Self::from_producer(move |cancel| service.load_user(cancel), executor)
    }

    /// Loaded user
    pub fn user(&self) -> Option<U> {
        self.operation.result()
    }
}

/// User save in progress or completed
#[derive(Debug, Clone)]
pub struct SaveUserOperation<U> {
    operation: Operation<()>,
    user: U,
}

impl<U: Clone + Send + 'static> SaveUserOperation<U> {
    /// Save `user` through `service`
    pub fn new<S>(service: Arc<S>, user: U, executor: Arc<dyn ContinuationExecutor>) -> Self
    where
        S: AuthenticationService<U> + ?Sized,
    {
        let sent = user.clone();
        let operation = Operation::with_properties(
            "SaveUser",
            move |cancel| service.save_user(sent, cancel),
            executor,
            &[USER],
        );
        Self { operation, user }
    }

    /// User being saved
    pub fn user(&self) -> &U {
        &self.user
    }
}

impl<U> Deref for SaveUserOperation<U> {
    type Target = Operation<()>;

    fn deref(&self) -> &Self::Target {
        &self.operation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    LoggingIn,
    LoggingOut,
    LoadingUser,
    SavingUser,
}

impl Activity {
    fn property(self) -> &'static str {
        match self {
            Activity::LoggingIn => IS_LOGGING_IN,
            Activity::LoggingOut => IS_LOGGING_OUT,
            Activity::LoadingUser => IS_LOADING_USER,
            Activity::SavingUser => IS_SAVING_USER,
        }
    }
}

struct Session<U> {
    user: U,
    activity: Option<Activity>,
}

struct ClientState<U> {
    session: Mutex<Session<U>>,
    notifier: PropertyNotifier,
}

impl<U: Clone> ClientState<U> {
    fn begin(&self, activity: Activity) -> Result<()> {
        {
            let mut session = self.session.lock();
            if let Some(current) = session.activity {
                return Err(Error::invalid_operation(format!(
                    "cannot start {:?} while {:?} is in progress",
                    activity, current
                )));
            }
            session.activity = Some(activity);
        }
        self.notifier.notify_all(&[IS_BUSY, activity.property()]);
        Ok(())
    }

    fn end(&self, user: Option<U>) {
        let (activity, user_changed) = {
            let mut session = self.session.lock();
            let user_changed = match user {
                Some(user) => {
                    session.user = user;
                    true
                }
                None => false,
            };
            (session.activity.take(), user_changed)
        };
        if user_changed {
            self.notifier.notify(USER);
        }
        if let Some(activity) = activity {
            self.notifier.notify_all(&[IS_BUSY, activity.property()]);
        }
    }
}

/// Session state of a client and the operations that change it
///
/// One operation runs at a time; starting another while one is in progress
/// fails with [`Error::InvalidOperation`].
pub struct AuthenticationClient<U> {
    service: Arc<dyn AuthenticationService<U>>,
    executor: Arc<dyn ContinuationExecutor>,
    state: Arc<ClientState<U>>,
}

impl<U: Clone + Send + Sync + 'static> AuthenticationClient<U> {
    /// Client talking to `service`, completing operations on `executor`
    pub fn new(service: Arc<dyn AuthenticationService<U>>, executor: Arc<dyn ContinuationExecutor>) -> Self {
        let user = service.anonymous_user();
        Self {
            service,
            executor,
            state: Arc::new(ClientState {
                session: Mutex::new(Session { user, activity: None }),
                notifier: PropertyNotifier::new(),
            }),
        }
    }

    /// Current user
    pub fn user(&self) -> U {
        self.state.session.lock().user.clone()
    }

    /// Whether an operation is in progress
    pub fn is_busy(&self) -> bool {
        self.state.session.lock().activity.is_some()
    }

    /// Whether a login is in progress
    pub fn is_logging_in(&self) -> bool {
        self.is(Activity::LoggingIn)
    }

    /// Whether a logout is in progress
    pub fn is_logging_out(&self) -> bool {
        self.is(Activity::LoggingOut)
    }

    /// Whether a user load is in progress
    pub fn is_loading_user(&self) -> bool {
        self.is(Activity::LoadingUser)
    }

    /// Whether a user save is in progress
    pub fn is_saving_user(&self) -> bool {
        self.is(Activity::SavingUser)
    }

    fn is(&self, activity: Activity) -> bool {
        self.state.session.lock().activity == Some(activity)
    }

    /// Subscribe to `User` and busy-state notifications
    pub fn subscribe(&self, listener: impl Fn(&str) + Send + Sync + 'static) {
        self.state.notifier.subscribe(listener);
    }

    /// Log in with `parameters`
    pub fn login(&self, parameters: LoginParameters) -> Result<LoginOperation<U>> {
        self.state.begin(Activity::LoggingIn)?;
        debug!(target: "ria::client", user = %parameters.user_name, "Logging in");
        let op = LoginOperation::new(Arc::clone(&self.service), parameters, Arc::clone(&self.executor));
        let state = Arc::clone(&self.state);
        op.on_completed(move |done| {
            let user = done.with_result(|r| r.filter(|r| r.login_success).and_then(|r| r.user.clone()));
            state.end(user);
        });
        self.launch(&op)?;
        Ok(op)
    }

    /// Log out; the user becomes anonymous
    pub fn logout(&self) -> Result<LogoutOperation<U>> {
        self.state.begin(Activity::LoggingOut)?;
        let op = LogoutOperation::new(Arc::clone(&self.service), Arc::clone(&self.executor));
        let state = Arc::clone(&self.state);
        let anonymous = self.service.anonymous_user();
        op.on_completed(move |done| {
            let user = match done.state() {
                OperationState::Succeeded => Some(done.result().unwrap_or(anonymous)),
                _ => None,
            };
            state.end(user);
        });
        self.launch(&op)?;
        Ok(op)
    }

    /// Load the user of the current session
    pub fn load_user(&self) -> Result<LoadUserOperation<U>> {
        self.state.begin(Activity::LoadingUser)?;
        let op = LoadUserOperation::new(Arc::clone(&self.service), Arc::clone(&self.executor));
        let state = Arc::clone(&self.state);
        op.on_completed(move |done| state.end(done.result()));
        self.launch(&op)?;
        Ok(op)
    }

    /// Save the current user
    pub fn save_user(&self) -> Result<SaveUserOperation<U>> {
        self.state.begin(Activity::SavingUser)?;
        let op = SaveUserOperation::new(Arc::clone(&self.service), self.user(), Arc::clone(&self.executor));
        let state = Arc::clone(&self.state);
        op.on_completed(move |_| state.end(None));
        self.launch(&op)?;
        Ok(op)
    }

    fn launch<T: Send + 'static>(&self, op: &Operation<T>) -> Result<()> {
        let started = op.start();
        if started.is_err() {
            self.state.end(None);
        }
        started
    }
}

impl<U> fmt::Debug for AuthenticationClient<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationClient")
            .field("activity", &self.state.session.lock().activity)
            .finish_non_exhaustive()
    }
}
