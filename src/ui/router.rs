/// Pages reachable from the chat window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    SignIn,
    Support,
    Contact,
    NotFound,
}

impl Route {
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "" => Route::Home,
            "/signin" => Route::SignIn,
            "/support" => Route::Support,
            "/contact" => Route::Contact,
            _ => Route::NotFound,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::SignIn => "/signin",
            Route::Support => "/support",
            Route::Contact => "/contact",
            Route::NotFound => "/404",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Home => "Live Public Chat",
            Route::SignIn => "Sign In",
            Route::Support => "Support",
            Route::Contact => "Contact",
            Route::NotFound => "Page Not Found",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path(""), Route::Home);
        assert_eq!(Route::from_path("/signin"), Route::SignIn);
        assert_eq!(Route::from_path("/support/"), Route::Support);
        assert_eq!(Route::from_path("/contact"), Route::Contact);
        assert_eq!(Route::from_path("/nope"), Route::NotFound);
    }

    #[test]
    fn paths_round_trip_for_real_pages() {
        for route in [Route::Home, Route::SignIn, Route::Support, Route::Contact] {
            assert_eq!(Route::from_path(route.path()), route);
        }
    }
}
