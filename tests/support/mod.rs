pub mod gif_fixture;
