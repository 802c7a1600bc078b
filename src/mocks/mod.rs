// Hardware and vendor stand-ins, only compiled during tests.

pub mod mock_camera;
pub mod mock_chat;
pub mod mock_i2c;
pub mod mock_servo;
