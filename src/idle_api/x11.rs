use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing::instrument;
use xcb::{
    screensaver::{QueryInfo, QueryInfoReply},
    x::Drawable,
    Connection,
};

use super::{IdleProbe, ProbeError};

pub struct X11IdleProbe {
    connection: Connection,
    preferred_screen: i32,
}

impl X11IdleProbe {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) =
            Connection::connect_with_extensions(None, &[xcb::Extension::ScreenSaver], &[])?;
        Ok(Self {
            connection,
            preferred_screen,
        })
    }

    fn query_idle(&self) -> Result<Duration> {
        let setup = self.connection.get_setup();

        // Currently the application only supports 1 x11 screen.
        let root = setup
            .roots()
            .nth(self.preferred_screen.max(0) as usize)
            .ok_or_else(|| anyhow!("Screen {} is not present", self.preferred_screen))?
            .root();
        let cookie = self.connection.send_request(&QueryInfo {
            drawable: Drawable::Window(root),
        });
        let reply: QueryInfoReply = self.connection.wait_for_reply(cookie)?;
        Ok(Duration::from_millis(reply.ms_since_user_input().into()))
    }
}

impl IdleProbe for X11IdleProbe {
    #[instrument(skip(self))]
    fn idle_time(&mut self) -> Result<Duration, ProbeError> {
        Ok(self.query_idle()?)
    }
}
